//! Outrigger demo CLI.
//!
//! Starts a simulated host, autoloads resources, and opens two dashboard
//! panels for the given context.
//!
//! # Usage
//!
//! ```bash
//! outrigger-demo [context]
//! ```
//!
//! # Example
//!
//! ```bash
//! OUTRIGGER_SETTINGS=./outrigger.json OUTRIGGER_LOG=debug outrigger-demo Alice
//! ```

use outrigger_core_plugins::ContextAPI;
use outrigger_demo::{Panel, SimulatedRuntime, build_server, close_panel, open_panel, settings_document};
use outrigger_resources::ResourceLoader;
use outrigger_scope::ScopeAPI;
use std::sync::Arc;
use std::time::Duration;

const PANELS: [Panel; 2] = [
    Panel {
        id: "sales-chart",
        addon: "dashboards",
        needs: &["chartjs", "dayjs"],
    },
    Panel {
        id: "ledger",
        addon: "ledger",
        needs: &["lodash"],
    },
];

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let context = std::env::args().nth(1);

    let runtime = Arc::new(
        SimulatedRuntime::new(Duration::from_millis(120))
            .with_global("jQuery")
            .with_unreachable_host("unpkg.com"),
    );
    let mut server = build_server(settings_document(), runtime.clone());

    let (Some(loader), Some(scope), Some(host_context)) = (
        server.api::<ResourceLoader>().cloned(),
        server.api::<ScopeAPI>().cloned(),
        server.api::<ContextAPI>().cloned(),
    ) else {
        eprintln!("Error: server is missing the loader, scope or context API");
        std::process::exit(1);
    };

    let report = loader.autoload().await;
    tracing::info!(loaded = ?report.loaded, failed = report.failed.len(), "autoload finished");

    loader.add_custom(
        "leaflet",
        "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js",
        Some("L"),
        Some("Interactive maps"),
    );
    if let Err(err) = loader.load("leaflet").await {
        tracing::warn!(error = %err, retryable = err.is_retryable(), "optional resource unavailable");
    }

    // The ledger add-on is restricted to one character.
    scope.bind_to_context("ledger", "Alice");
    host_context.set_current(context.as_deref());

    let [sales, ledger] = PANELS;
    let (sales_result, ledger_result) = tokio::join!(
        open_panel(&scope, &loader, sales),
        open_panel(&scope, &loader, ledger)
    );
    for (panel, result) in [(sales, sales_result), (ledger, ledger_result)] {
        match result {
            Ok(Some(handles)) => tracing::info!(panel = panel.id, ?handles, "panel ready"),
            Ok(None) => tracing::info!(panel = panel.id, "panel not shown in this context"),
            Err(err) => tracing::error!(panel = panel.id, error = %err, "panel failed to open"),
        }
    }

    // Remember the charting library for next time.
    loader.set_autoload("chartjs", true);

    for panel in PANELS {
        close_panel(&loader, panel);
    }
    tracing::info!(
        idle = ?loader.idle_resources(),
        globals = ?runtime.globals(),
        "session finished"
    );

    server.cleanup();
}
