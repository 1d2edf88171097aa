//! Common Test Infrastructure
//!
//! Provides shared utilities for integration tests:
//! - A scripted platform CLI that records invocations
//! - A fixed app locator pointing every app at a mock server
//! - Configuration and fast retry policies

#![allow(dead_code)]

use async_trait::async_trait;
use broker_smoke_tests::config::SmokeConfig;
use broker_smoke_tests::facade::AppLocator;
use broker_smoke_tests::lifecycle::Policies;
use broker_smoke_tests::platform::{CommandOutput, Platform, PlatformError};
use broker_smoke_tests::retry::RetryPolicy;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Platform CLI double.
///
/// Every command exits 0 unless its subcommand was registered with
/// [`ScriptedPlatform::fail_on`], in which case it exits 1.
#[derive(Default)]
pub struct ScriptedPlatform {
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(self, subcommand: &str) -> Self {
        self.failing.lock().unwrap().insert(subcommand.to_string());
        self
    }

    /// Full argument lists, in call order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Subcommand of every call, in call order
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c[0].clone()).collect()
    }

    pub fn call_for(&self, subcommand: &str) -> Option<Vec<String>> {
        self.calls().into_iter().find(|c| c[0] == subcommand)
    }
}

#[async_trait]
impl Platform for ScriptedPlatform {
    async fn execute(
        &self,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput, PlatformError> {
        self.calls.lock().unwrap().push(args.to_vec());
        if self.failing.lock().unwrap().contains(&args[0]) {
            Ok(CommandOutput::failure(1, format!("FAILED: {}", args[0])))
        } else {
            Ok(CommandOutput::success())
        }
    }
}

/// Serves every app from one base URL
pub struct FixedLocator(pub String);

impl AppLocator for FixedLocator {
    fn app_url(&self, _app_name: &str) -> String {
        self.0.clone()
    }
}

pub fn fast_policies() -> Policies {
    let policy = RetryPolicy::new(Duration::from_millis(500), Duration::from_millis(20));
    Policies {
        default: policy,
        start: policy,
        request_timeout: Duration::from_secs(2),
    }
}

pub fn smoke_config(test_stomp: bool, test_mqtt: bool) -> SmokeConfig {
    serde_json::from_value(serde_json::json!({
        "api": "https://api.example.com",
        "apps_domain": "apps.example.com",
        "admin_user": "admin",
        "admin_password": "admin-password",
        "skip_ssl_validation": true,
        "service_name": "p-rabbitmq",
        "plan_names": ["standard"],
        "rabbitmq_skip_ssl": true,
        "test_stomp": test_stomp,
        "test_mqtt": test_mqtt,
        "timeouts": {
            "default_secs": 1,
            "retry_interval_secs": 1,
            "start_secs": 1
        }
    }))
    .expect("valid test config")
}
