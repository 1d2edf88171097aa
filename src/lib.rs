//! Broker Smoke Tests Library
//!
//! End-to-end smoke tests for a message-broker service offered through a
//! platform marketplace.
//!
//! # Features
//!
//! - **Full Lifecycle**: push app, create and bind a service instance, start, exercise, clean up
//! - **Every Plan**: one scenario per configured plan and enabled protocol (AMQP, STOMP, MQTT)
//! - **Scaled Timeouts**: retrying assertions whose deadlines scale with `timeout_scale`
//! - **Safe Cleanup**: only deletes what the scenario actually created
//! - **Reports**: human summary, JSON report, Prometheus textfile
//!
//! # Example
//!
//! ```no_run
//! use broker_smoke_tests::{config::SmokeConfig, platform::CfCli, run_suite};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SmokeConfig::from_env()?;
//!     let cli = CfCli::new(&config.cli.cf_binary);
//!     let report = run_suite(&config, &cli, &[]).await;
//!     print!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod facade;
pub mod lifecycle;
pub mod metrics;
pub mod platform;
pub mod report;
pub mod retry;
pub mod suite;
pub mod telemetry;

// Re-export commonly used types
pub use config::SmokeConfig;
pub use report::SuiteReport;
pub use suite::run_suite;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
