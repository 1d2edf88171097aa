//! Broker Smoke Tests - provision, bind, exercise and tear down a broker
//! service instance for every configured plan.

use anyhow::Context;
use broker_smoke_tests::config::{ConfigError, SmokeConfig};
use broker_smoke_tests::metrics;
use broker_smoke_tests::platform::{CfCli, CliHome};
use broker_smoke_tests::run_suite;
use broker_smoke_tests::telemetry::{init_subscriber, LogFormat};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

/// Broker Smoke Tests - end-to-end checks of a marketplace broker service
#[derive(Parser, Debug)]
#[command(name = "broker-smoke-tests")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Only run these configured plans (repeatable)
    #[arg(long = "plan", value_name = "NAME")]
    plans: Vec<String>,

    /// Write the run report as JSON
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Write Prometheus metrics in textfile format
    #[arg(long, value_name = "PATH")]
    metrics_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    init_subscriber(&args.log_level, args.log_format)?;

    info!("Starting broker smoke tests v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration; any failure aborts before a scenario runs
    let config_path = args.config.ok_or(ConfigError::MissingPath)?;
    let config = SmokeConfig::load(&config_path)
        .with_context(|| format!("failed to load configuration from {:?}", config_path))?;
    info!("Loaded configuration from {:?}", config_path);

    if let Some(unknown) = args.plans.iter().find(|p| !config.plan_names.contains(*p)) {
        anyhow::bail!(
            "plan '{}' is not in the configured plan_names {:?}",
            unknown,
            config.plan_names
        );
    }

    let home = CliHome::create(&config.cli.name_prefix)
        .await
        .context("failed to create CF_HOME directory")?;
    let cli = CfCli::new(&config.cli.cf_binary).with_home(home.path());

    let report = run_suite(&config, &cli, &args.plans).await;

    if let Err(e) = home.remove().await {
        warn!(error = %e, "failed to remove CF_HOME directory");
    }

    print!("{}", report.summary());

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .await
            .with_context(|| format!("failed to write report to {:?}", path))?;
    }
    if let Some(path) = &args.metrics_file {
        metrics::write_textfile(path)
            .await
            .with_context(|| format!("failed to write metrics to {:?}", path))?;
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
