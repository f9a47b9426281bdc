//! Randomized request storms against the loader.
//!
//! Each case fires a random multiset of load requests (some for unknown
//! names, some for resources scripted to fail once) concurrently and checks
//! that no resource was injected more often than it was attempted.
//!
//! `proptest` has no async test support, so each case builds its own runtime
//! and blocks on it.

use outrigger_resources::{MockInjector, ResourceDescriptor, ResourceError, ResourceLoader};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

const NAMES: [&str; 4] = ["alpha", "beta", "gamma", "ghost"];

fn loader(injector: &Arc<MockInjector>) -> ResourceLoader {
    let mut builder = ResourceLoader::builder(injector.clone()).without_builtins();
    for name in &NAMES[..3] {
        builder = builder.resource(ResourceDescriptor::new(
            *name,
            format!("https://cdn.example/{name}.js"),
            *name,
        ));
    }
    builder.build()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn one_injection_per_resource(
        requests in prop::collection::vec(0..NAMES.len(), 1..48),
        failing in prop::collection::vec(any::<bool>(), 3),
    ) {
        let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
        rt.block_on(async {
            let injector = Arc::new(MockInjector::new());
            for (name, fails) in NAMES.iter().zip(&failing) {
                if *fails {
                    injector.fail_next(name, 1);
                }
            }
            let loader = Arc::new(loader(&injector));

            let tasks: Vec<_> = requests
                .iter()
                .map(|&i| {
                    let loader = Arc::clone(&loader);
                    tokio::spawn(async move { (NAMES[i], loader.load(NAMES[i]).await) })
                })
                .collect();

            let mut outcomes: HashMap<&str, Vec<Result<_, ResourceError>>> = HashMap::new();
            for task in tasks {
                let (name, result) = task.await.expect("load task");
                outcomes.entry(name).or_default().push(result);
            }

            for (name, results) in &outcomes {
                if *name == "ghost" {
                    prop_assert!(results.iter().all(|r| matches!(r, Err(ResourceError::NotRegistered(_)))));
                    continue;
                }
                let injections = injector.injections(name);
                // A scripted failure allows exactly one retry by a later caller.
                let fails = failing[NAMES.iter().position(|n| n == name).unwrap_or(0)];
                prop_assert!(injections >= 1);
                prop_assert!(injections <= if fails { 2 } else { 1 }, "injections = {}", injections);
                if !fails {
                    prop_assert!(results.iter().all(Result::is_ok));
                }
            }
            prop_assert_eq!(injector.injections("ghost"), 0);
            Ok(())
        })?;
    }
}
