//! A full host session through the public prelude: settings on disk,
//! autoload across restarts, scoped add-ons sharing a resource.

use outrigger_internal::outrigger_resources::MockInjector;
use outrigger_internal::prelude::*;
use std::path::Path;
use std::sync::Arc;

fn start(path: &Path, injector: &Arc<MockInjector>) -> Server {
    let document = SettingsDocument::open(path).unwrap();
    let mut server = Server::new();
    server
        .add_plugins(MinimalPlugins.build().set(SettingsPlugin::with_store(document)))
        .add_plugins(
            ResourceLoaderPlugin::with_shared_injector(injector.clone()).with_resource(
                ResourceDescriptor::new("chartjs", "https://cdn.example/chart.js", "Chart"),
            ),
        )
        .add_plugins(ScopePlugin::new());
    server.finish();
    server
}

#[tokio::test]
async fn preferences_and_bindings_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let first = Arc::new(MockInjector::new());
    let mut server = start(&path, &first);
    {
        let loader = server.api::<ResourceLoader>().unwrap();
        let scope = server.api::<ScopeAPI>().unwrap();

        loader.set_autoload("axios", true);
        scope.bind_to_context("dashboards", "Alice");
        assert!(!loader.is_loaded("axios"));
    }
    server.cleanup();

    let second = Arc::new(MockInjector::new());
    let server = start(&path, &second);
    let loader = server.api::<ResourceLoader>().unwrap();
    let scope = server.api::<ScopeAPI>().unwrap();
    let context = server.api::<ContextAPI>().unwrap();

    let report = loader.autoload().await;
    assert_eq!(report.loaded, vec!["axios"]);
    assert!(loader.is_loaded("axios"));
    assert_eq!(second.injections("axios"), 1);

    assert!(!scope.is_active_now("dashboards"));
    context.set_current(Some("Alice"));
    assert!(scope.is_active_now("dashboards"));
}

#[tokio::test]
async fn active_addons_share_one_injection() {
    let dir = tempfile::tempdir().unwrap();
    let injector = Arc::new(MockInjector::new());
    let server = start(&dir.path().join("settings.json"), &injector);

    let loader = server.api::<ResourceLoader>().unwrap();
    let scope = server.api::<ScopeAPI>().unwrap();
    scope.bind_to_context("panelB", "Bob");

    let mut holders = Vec::new();
    for panel in ["panelA", "panelB", "panelC"] {
        if scope.is_active(panel, Some("Alice")) {
            loader.acquire("chartjs", panel).await.unwrap();
            holders.push(panel);
        }
    }

    assert_eq!(holders, vec!["panelA", "panelC"]);
    assert_eq!(injector.injections("Chart"), 1);
    assert_eq!(loader.release("chartjs", "panelA"), Ok(Release::Held { remaining: 1 }));
    assert_eq!(loader.release("chartjs", "panelC"), Ok(Release::Idle));
    assert!(loader.is_loaded("chartjs"));
}
