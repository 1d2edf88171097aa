//! Run results
//!
//! Every lifecycle step ends in a [`StepResult`]; steps are grouped per
//! plan and protocol into a [`ScenarioReport`], and the whole run into a
//! [`SuiteReport`] that decides the exit status.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::lifecycle::Protocol;

/// Lifecycle steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    PushApp,
    CreateService,
    BindAndStart,
    Exercise,
    Unbind,
    DeleteService,
    DeleteApp,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::PushApp => "push_app",
            Step::CreateService => "create_service",
            Step::BindAndStart => "bind_and_start",
            Step::Exercise => "exercise",
            Step::Unbind => "unbind",
            Step::DeleteService => "delete_service",
            Step::DeleteApp => "delete_app",
        }
    }

    pub fn is_cleanup(&self) -> bool {
        matches!(self, Step::Unbind | Step::DeleteService | Step::DeleteApp)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed(String),
    /// Not attempted because a step it depends on did not succeed
    Skipped(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed(_) => "failed",
            Outcome::Skipped(_) => "skipped",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: Step,
    pub outcome: Outcome,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Results of one plan × protocol lifecycle
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub plan: String,
    pub protocol: Protocol,
    pub app_name: String,
    pub instance_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepResult>,
}

impl ScenarioReport {
    pub fn new(plan: impl Into<String>, protocol: Protocol, app_name: impl Into<String>) -> Self {
        Self {
            plan: plan.into(),
            protocol,
            app_name: app_name.into(),
            instance_name: None,
            started_at: Utc::now(),
            steps: Vec::new(),
        }
    }

    /// A scenario passes when none of its steps failed
    pub fn passed(&self) -> bool {
        !self.steps.iter().any(|s| s.outcome.is_failure())
    }

    pub fn outcome_of(&self, step: Step) -> Option<&Outcome> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.outcome)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| s.outcome.is_failure())
    }

    pub fn title(&self) -> String {
        format!("{} / {}", self.plan, self.protocol)
    }
}

/// Results of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub scenarios: Vec<ScenarioReport>,
    /// Suite workspace setup or teardown failures
    pub context_errors: Vec<String>,
}

impl Default for SuiteReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SuiteReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            scenarios: Vec::new(),
            context_errors: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn passed(&self) -> bool {
        self.context_errors.is_empty() && self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn failed_scenarios(&self) -> usize {
        self.scenarios.iter().filter(|s| !s.passed()).count()
    }

    /// Human-readable summary, one line per step
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for scenario in &self.scenarios {
            let verdict = if scenario.passed() { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "[{}] {} (app {})\n",
                verdict,
                scenario.title(),
                scenario.app_name
            ));
            for result in &scenario.steps {
                let detail = match &result.outcome {
                    Outcome::Passed => String::new(),
                    Outcome::Failed(reason) | Outcome::Skipped(reason) => format!(": {}", reason),
                };
                out.push_str(&format!(
                    "    {:<15} {:<8} {:>7.1}s{}\n",
                    result.step.as_str(),
                    result.outcome.label(),
                    result.elapsed.as_secs_f64(),
                    detail
                ));
            }
        }
        for error in &self.context_errors {
            out.push_str(&format!("[FAIL] suite context: {}\n", error));
        }
        out.push_str(&format!(
            "{} scenario(s), {} failed\n",
            self.scenarios.len(),
            self.failed_scenarios()
        ));
        out
    }

    /// Write the report as pretty JSON
    pub async fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(step: Step, outcome: Outcome) -> StepResult {
        StepResult {
            step,
            outcome,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_scenario_passes_with_skips() {
        let mut scenario = ScenarioReport::new("standard", Protocol::Amqp, "app");
        scenario.steps.push(result(Step::PushApp, Outcome::Passed));
        scenario
            .steps
            .push(result(Step::Unbind, Outcome::Skipped("not bound".into())));
        assert!(scenario.passed());
    }

    #[test]
    fn test_scenario_fails_on_any_failure() {
        let mut scenario = ScenarioReport::new("standard", Protocol::Amqp, "app");
        scenario.steps.push(result(Step::PushApp, Outcome::Passed));
        scenario
            .steps
            .push(result(Step::CreateService, Outcome::Failed("exit 1".into())));
        assert!(!scenario.passed());
        assert_eq!(scenario.failed_steps().count(), 1);
    }

    #[test]
    fn test_suite_fails_on_context_error() {
        let mut suite = SuiteReport::new();
        suite.context_errors.push("delete-org failed".into());
        assert!(!suite.passed());
    }

    #[test]
    fn test_summary_names_failed_step() {
        let mut suite = SuiteReport::new();
        let mut scenario = ScenarioReport::new("standard", Protocol::Mqtt, "app-1");
        scenario
            .steps
            .push(result(Step::BindAndStart, Outcome::Failed("ping timed out".into())));
        suite.scenarios.push(scenario);

        let summary = suite.summary();
        assert!(summary.contains("[FAIL] standard / mqtt"));
        assert!(summary.contains("bind_and_start"));
        assert!(summary.contains("ping timed out"));
        assert!(summary.contains("1 scenario(s), 1 failed"));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(result(Step::Exercise, Outcome::Skipped("x".into()))).unwrap();
        assert_eq!(json["step"], "exercise");
        assert_eq!(json["outcome"]["status"], "skipped");
        assert_eq!(json["outcome"]["reason"], "x");
        assert_eq!(json["elapsed_ms"], 1500);
    }
}
