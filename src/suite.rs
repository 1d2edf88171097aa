//! Whole-run driver: suite workspace, every scenario, teardown.

use crate::config::SmokeConfig;
use crate::context::SuiteContext;
use crate::lifecycle::{Orchestrator, Policies, ScenarioTable};
use crate::platform::Platform;
use crate::report::SuiteReport;

/// Run the configured scenarios (restricted to `plans` when non-empty).
///
/// A failed workspace setup skips every scenario; teardown is attempted
/// either way. Both kinds of failure end up in the report's context errors.
pub async fn run_suite(
    config: &SmokeConfig,
    platform: &dyn Platform,
    plans: &[String],
) -> SuiteReport {
    let mut report = SuiteReport::new();
    let mut table = ScenarioTable::from_config(config);
    table.retain_plans(plans);

    let timeout = Policies::from_config(config).default.timeout;
    let mut context = SuiteContext::new(&config.cli.name_prefix);

    match context.setup(platform, config, timeout).await {
        Ok(()) => {
            tracing::info!(scenarios = table.len(), "running scenarios");
            report.scenarios = Orchestrator::new(config, platform).run_all(&table).await;
        }
        Err(e) => {
            tracing::error!(error = %e, "suite setup failed, no scenario will run");
            report.context_errors.push(e.to_string());
        }
    }

    if let Err(e) = context.teardown(platform, timeout).await {
        tracing::error!(error = %e, "suite teardown failed");
        report.context_errors.push(e.to_string());
    }

    report.finish();
    report
}
