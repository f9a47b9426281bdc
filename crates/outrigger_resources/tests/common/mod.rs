#![allow(dead_code, reason = "each test binary uses a different subset")]

use outrigger_resources::{MockInjector, ResourceDescriptor, ResourceLoader};
use std::sync::Arc;

pub const CHART_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js";

pub fn chartjs() -> ResourceDescriptor {
    ResourceDescriptor::new("chartjs", CHART_URL, "Chart").with_description("Charting library")
}

/// Loader over `injector` with only the chartjs resource registered.
pub fn chart_loader(injector: &Arc<MockInjector>) -> ResourceLoader {
    ResourceLoader::builder(injector.clone())
        .without_builtins()
        .resource(chartjs())
        .build()
}
