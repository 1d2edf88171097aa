//! Provision → bind → start → exercise → cleanup for one scenario

use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::Instrument;

use super::{random_name, Protocol, Scenario, ScenarioTable};
use crate::config::SmokeConfig;
use crate::facade::{lists_queue, AppClient, AppLocator, FacadeError, Reply};
use crate::metrics;
use crate::platform::{Platform, PlatformError};
use crate::report::{Outcome, ScenarioReport, Step, StepResult};
use crate::retry::{eventually, RetryError, RetryPolicy};

/// Queue created and used by every exercise step
pub const TEST_QUEUE: &str = "test-q";

/// Why a step failed
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Assertion(#[from] RetryError),

    #[error(transparent)]
    Facade(#[from] FacadeError),
}

/// Timeouts in effect for a run, already scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policies {
    /// CLI steps and HTTP assertions
    pub default: RetryPolicy,
    /// `set-env` and `start`
    pub start: RetryPolicy,
    /// Cap on a single HTTP request
    pub request_timeout: Duration,
}

impl Policies {
    pub fn from_config(config: &SmokeConfig) -> Self {
        let scale = config.scale();
        Self {
            default: config.timeouts.default_policy(scale),
            start: config.timeouts.start_policy(scale),
            request_timeout: config.timeouts.request_timeout(),
        }
    }
}

/// What a scenario has managed to create so far.
///
/// Later steps and every cleanup action are gated on these flags.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub app_name: String,
    pub instance_name: Option<String>,
    pub pushed: bool,
    pub service_created: bool,
    pub bound: bool,
    pub running: bool,
}

impl RunState {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }
}

fn gate(ok: bool, reason: &str) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(reason.to_string())
    }
}

/// Drives scenarios against a platform, one at a time.
pub struct Orchestrator<'a> {
    config: &'a SmokeConfig,
    platform: &'a dyn Platform,
    locator: &'a dyn AppLocator,
    policies: Policies,
}

impl<'a> Orchestrator<'a> {
    /// Apps are reached at `https://<app>.<apps_domain>`.
    pub fn new(config: &'a SmokeConfig, platform: &'a dyn Platform) -> Self {
        Self {
            config,
            platform,
            locator: config,
            policies: Policies::from_config(config),
        }
    }

    pub fn with_locator(mut self, locator: &'a dyn AppLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    /// Run every scenario in order. A failing scenario never stops the next.
    pub async fn run_all(&self, table: &ScenarioTable) -> Vec<ScenarioReport> {
        let mut reports = Vec::with_capacity(table.len());
        for scenario in table.iter() {
            let report = self.run_scenario(scenario).await;
            metrics::record_scenario(&report.plan, report.protocol.as_str(), report.passed());
            reports.push(report);
        }
        reports
    }

    /// Run one full lifecycle and report every step.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let mut state = RunState::new(random_name());
        let mut report = ScenarioReport::new(&scenario.plan, scenario.protocol, &state.app_name);
        let span = tracing::info_span!(
            "scenario",
            plan = %scenario.plan,
            protocol = %scenario.protocol,
            app = %state.app_name
        );

        async {
            tracing::info!("starting scenario");

            let pushed = self
                .attempt(
                    &mut report,
                    Step::PushApp,
                    Ok(()),
                    self.push_app(&state.app_name, &scenario.app_path),
                )
                .await;
            state.pushed = pushed;

            if state.pushed {
                let instance = random_name();
                report.instance_name = Some(instance.clone());
                state.instance_name = Some(instance);
            }
            let created = self
                .attempt(
                    &mut report,
                    Step::CreateService,
                    gate(state.pushed, "application was not pushed"),
                    self.create_service(&scenario.plan, state.instance_name.as_deref()),
                )
                .await;
            state.service_created = created;

            let ready = gate(
                state.pushed && state.service_created,
                "application or service instance missing",
            );
            let running = self
                .attempt(&mut report, Step::BindAndStart, ready, self.bind_and_start(&mut state))
                .await;
            state.running = running;

            let ready = gate(
                state.pushed && state.service_created && state.bound && state.running,
                "application is not running with the service bound",
            );
            self.attempt(
                &mut report,
                Step::Exercise,
                ready,
                self.exercise(&state.app_name, scenario.protocol),
            )
            .await;

            self.cleanup(&mut report, &state).await;

            if report.passed() {
                tracing::info!("scenario passed");
            } else {
                tracing::warn!(
                    failed = ?report.failed_steps().map(|s| s.step.as_str()).collect::<Vec<_>>(),
                    "scenario failed"
                );
            }
        }
        .instrument(span)
        .await;

        report
    }

    /// Run `action` unless `ready` says otherwise, and record the outcome.
    /// Returns whether the step passed.
    async fn attempt<F>(
        &self,
        report: &mut ScenarioReport,
        step: Step,
        ready: Result<(), String>,
        action: F,
    ) -> bool
    where
        F: Future<Output = Result<(), StepError>>,
    {
        let started = Instant::now();
        let outcome = match ready {
            Err(reason) => Outcome::Skipped(reason),
            Ok(()) => match action.await {
                Ok(()) => Outcome::Passed,
                Err(e) => Outcome::Failed(e.to_string()),
            },
        };
        let elapsed = started.elapsed();

        match &outcome {
            Outcome::Passed => tracing::info!(step = %step, ?elapsed, "step passed"),
            Outcome::Failed(reason) => tracing::error!(step = %step, %reason, "step failed"),
            Outcome::Skipped(reason) => tracing::warn!(step = %step, %reason, "step skipped"),
        }
        metrics::record_step(
            step.as_str(),
            report.protocol.as_str(),
            outcome.label(),
            elapsed.as_secs_f64(),
        );

        let passed = outcome == Outcome::Passed;
        report.steps.push(StepResult {
            step,
            outcome,
            elapsed,
        });
        passed
    }

    async fn push_app(&self, app_name: &str, app_path: &Path) -> Result<(), StepError> {
        let path = app_path.to_string_lossy();
        let cli = &self.config.cli;
        self.platform
            .cf(
                &[
                    "push",
                    app_name,
                    "-m",
                    cli.app_memory.as_str(),
                    "-p",
                    path.as_ref(),
                    "-s",
                    cli.stack.as_str(),
                    "--no-start",
                ],
                self.policies.default.timeout,
            )
            .await?;
        Ok(())
    }

    async fn create_service(&self, plan: &str, instance: Option<&str>) -> Result<(), StepError> {
        let instance = instance.unwrap_or_default();
        self.platform
            .cf(
                &[
                    "create-service",
                    self.config.service_name.as_str(),
                    plan,
                    instance,
                ],
                self.policies.default.timeout,
            )
            .await?;
        Ok(())
    }

    async fn bind_and_start(&self, state: &mut RunState) -> Result<(), StepError> {
        let app = state.app_name.clone();
        let instance = state.instance_name.clone().unwrap_or_default();

        self.platform
            .cf(&["bind-service", app.as_str(), instance.as_str()], self.policies.default.timeout)
            .await?;
        state.bound = true;

        self.platform
            .cf(
                &[
                    "set-env",
                    app.as_str(),
                    "RABBITMQ_SKIP_SSL",
                    self.config.rabbitmq_skip_ssl_flag(),
                ],
                self.policies.start.timeout,
            )
            .await?;
        self.platform
            .cf(&["start", app.as_str()], self.policies.start.timeout)
            .await?;

        let client = self.client_for(&app)?;
        tracing::info!(url = %format!("{}/ping", client.base_url()), "checking that the app is responding");
        eventually(
            "GET /ping contains OK",
            &self.policies.default,
            || client.ping(),
            |body| body.contains("OK"),
        )
        .await?;
        Ok(())
    }

    /// Queue round trip through the sample app. The read after the message
    /// has been consumed must come back empty.
    async fn exercise(&self, app_name: &str, protocol: Protocol) -> Result<(), StepError> {
        let client = self.client_for(app_name)?;
        let policy = &self.policies.default;
        let message = protocol.test_message();

        if protocol.manages_queues() {
            tracing::info!(queue = TEST_QUEUE, "creating a new queue");
            eventually(
                "POST /queues returns SUCCESS",
                policy,
                || client.create_queue(TEST_QUEUE),
                |body| body.contains("SUCCESS"),
            )
            .await?;

            tracing::info!("listing the queues");
            eventually(
                "GET /queues lists the queue",
                policy,
                || client.list_queues(),
                |body| lists_queue(body, TEST_QUEUE),
            )
            .await?;
        }

        tracing::info!(queue = TEST_QUEUE, "publishing to the queue");
        eventually(
            "PUT /queue returns SUCCESS",
            policy,
            || client.publish(TEST_QUEUE, message),
            |body| body.contains("SUCCESS"),
        )
        .await?;

        tracing::info!(queue = TEST_QUEUE, "reading from the (non-empty) queue");
        eventually(
            "GET /queue returns the published message",
            policy,
            || client.read(TEST_QUEUE),
            |body| body.trim_end_matches(['\r', '\n']) == message,
        )
        .await?;

        tracing::info!(queue = TEST_QUEUE, "reading from the (empty) queue");
        eventually(
            "GET /queue returns an empty body with a success status",
            policy,
            || client.read_reply(TEST_QUEUE),
            Reply::is_empty_success,
        )
        .await?;

        Ok(())
    }

    /// Undo whatever the scenario created, newest first. Each action is
    /// independent: one failing does not stop the others.
    async fn cleanup(&self, report: &mut ScenarioReport, state: &RunState) {
        let app = state.app_name.as_str();
        let instance = state.instance_name.as_deref().unwrap_or_default();
        let timeout = self.policies.default.timeout;

        self.attempt(
            report,
            Step::Unbind,
            gate(state.bound, "service was never bound"),
            self.cleanup_command(&["unbind-service", app, instance], timeout),
        )
        .await;
        self.attempt(
            report,
            Step::DeleteService,
            gate(state.service_created, "service instance was never created"),
            self.cleanup_command(&["delete-service", "-f", instance], timeout),
        )
        .await;
        self.attempt(
            report,
            Step::DeleteApp,
            gate(state.pushed, "application was never pushed"),
            self.cleanup_command(&["delete", app, "-f"], timeout),
        )
        .await;
    }

    async fn cleanup_command(&self, args: &[&str], timeout: Duration) -> Result<(), StepError> {
        self.platform.cf(args, timeout).await?;
        Ok(())
    }

    fn client_for(&self, app_name: &str) -> Result<AppClient, FacadeError> {
        AppClient::new(
            self.locator.app_url(app_name),
            self.config.skip_ssl_validation,
            self.policies.request_timeout,
        )
    }
}
