//! Lifecycle module
//!
//! A smoke run is a table of scenarios, one per configured plan and enabled
//! protocol variant. Each scenario pushes the matching sample app, creates
//! and binds a service instance, exercises the broker through the app, and
//! cleans up whatever it managed to create.
//!
//! # Example
//!
//! ```no_run
//! use broker_smoke_tests::config::SmokeConfig;
//! use broker_smoke_tests::lifecycle::{Orchestrator, ScenarioTable};
//! use broker_smoke_tests::platform::CfCli;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SmokeConfig::from_env()?;
//! let cli = CfCli::new(&config.cli.cf_binary);
//! let table = ScenarioTable::from_config(&config);
//!
//! let orchestrator = Orchestrator::new(&config, &cli);
//! for report in orchestrator.run_all(&table).await {
//!     println!("{}: passed={}", report.title(), report.passed());
//! }
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::config::SmokeConfig;

mod orchestrator;

pub use orchestrator::{Orchestrator, Policies, RunState, StepError, TEST_QUEUE};

/// Protocol front-end exercised by a sample application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Amqp,
    Stomp,
    Mqtt,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Amqp => "amqp",
            Protocol::Stomp => "stomp",
            Protocol::Mqtt => "mqtt",
        }
    }

    /// Directory of the sample app bundle under the assets directory
    pub fn app_dir(&self) -> &'static str {
        match self {
            Protocol::Amqp => "cf-rabbitmq-example-app",
            Protocol::Stomp => "cf-rabbitmq-example-stomp-app",
            Protocol::Mqtt => "cf-rabbitmq-example-mqtt-app",
        }
    }

    /// Message published and read back during the exercise step
    pub fn test_message(&self) -> &'static str {
        match self {
            Protocol::Amqp => "test-message-amqp",
            Protocol::Stomp => "test-message-stomp",
            Protocol::Mqtt => "test-message-mqtt",
        }
    }

    /// Only the AMQP app exposes `/queues` for creating and listing queues.
    pub fn manages_queues(&self) -> bool {
        matches!(self, Protocol::Amqp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One plan × protocol lifecycle to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub plan: String,
    pub protocol: Protocol,
    pub app_path: PathBuf,
}

/// Ordered scenarios for a run
#[derive(Debug, Clone, Default)]
pub struct ScenarioTable {
    scenarios: Vec<Scenario>,
}

impl ScenarioTable {
    /// For each plan in order: AMQP, then STOMP and MQTT when enabled.
    pub fn from_config(config: &SmokeConfig) -> Self {
        let mut protocols = vec![Protocol::Amqp];
        if config.test_stomp {
            protocols.push(Protocol::Stomp);
        }
        if config.test_mqtt {
            protocols.push(Protocol::Mqtt);
        }

        let scenarios = config
            .plan_names
            .iter()
            .flat_map(|plan| {
                protocols.iter().map(move |protocol| Scenario {
                    plan: plan.clone(),
                    protocol: *protocol,
                    app_path: config.cli.assets_dir.join(protocol.app_dir()),
                })
            })
            .collect();

        Self { scenarios }
    }

    /// Keep only scenarios for the named plans. An empty list keeps all.
    pub fn retain_plans(&mut self, plans: &[String]) {
        if plans.is_empty() {
            return;
        }
        self.scenarios.retain(|s| plans.contains(&s.plan));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Random name for apps, service instances and suite orgs
pub fn random_name() -> String {
    uuid::Uuid::new_v4().to_string()
}
