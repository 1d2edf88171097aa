//! Metrics module
//!
//! Prometheus counters for step and scenario outcomes, exported as a
//! node-exporter textfile at the end of a run.

pub mod textfile;

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

pub use textfile::{render, write_textfile};

lazy_static! {
    // Step metrics
    pub static ref STEPS_TOTAL: CounterVec = register_counter_vec!(
        "broker_smoke_steps_total",
        "Lifecycle steps by outcome",
        &["step", "protocol", "outcome"]
    ).unwrap();

    pub static ref STEP_DURATION: HistogramVec = register_histogram_vec!(
        "broker_smoke_step_duration_seconds",
        "Lifecycle step duration in seconds",
        &["step"],
        vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 900.0]
    ).unwrap();

    // Scenario metrics
    pub static ref SCENARIOS_TOTAL: CounterVec = register_counter_vec!(
        "broker_smoke_scenarios_total",
        "Plan and protocol scenarios by result",
        &["plan", "protocol", "result"]
    ).unwrap();
}

/// Record a finished step
pub fn record_step(step: &str, protocol: &str, outcome: &str, duration_secs: f64) {
    STEPS_TOTAL
        .with_label_values(&[step, protocol, outcome])
        .inc();
    STEP_DURATION.with_label_values(&[step]).observe(duration_secs);
}

/// Record a finished scenario
pub fn record_scenario(plan: &str, protocol: &str, passed: bool) {
    let result = if passed { "passed" } else { "failed" };
    SCENARIOS_TOTAL
        .with_label_values(&[plan, protocol, result])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_step() {
        record_step("push_app", "amqp", "passed", 3.2);
        let value = STEPS_TOTAL
            .with_label_values(&["push_app", "amqp", "passed"])
            .get();
        assert!(value >= 1.0);
    }

    #[test]
    fn test_record_scenario_failure() {
        record_scenario("metrics-unit-plan", "mqtt", false);
        let value = SCENARIOS_TOTAL
            .with_label_values(&["metrics-unit-plan", "mqtt", "failed"])
            .get();
        assert_eq!(value, 1.0);
    }
}
