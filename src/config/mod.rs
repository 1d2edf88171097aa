//! Configuration module for the broker smoke tests
//!
//! Handles loading and parsing of the JSON configuration file named by
//! `CONFIG_PATH`, with support for environment variable expansion and
//! validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::{ConfigLoader, CONFIG_PATH_ENV};

use crate::retry::{RetryPolicy, TimeoutScale};

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with a letter or underscore and contain only
/// uppercase letters, digits, and underscores.
///
/// # Examples
///
/// ```ignore
/// std::env::set_var("CF_ADMIN_PASSWORD", "secret");
/// let result = expand_env_vars("${CF_ADMIN_PASSWORD}");
/// assert_eq!(result, "secret");
///
/// let result = expand_env_vars("${MISSING:-admin}");
/// assert_eq!(result, "admin");
/// ```
pub(crate) fn expand_env_vars(s: &str) -> String {
    // ${VAR} or ${VAR:-default}
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var pattern is valid");
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default: leave the placeholder as written.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

/// Custom deserializer for strings with environment variable expansion.
///
/// Expansion happens on the decoded value, so a variable holding quotes or
/// backslashes cannot break the surrounding JSON.
fn deserialize_with_env<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(expand_env_vars(&s))
}

/// [`deserialize_with_env`] for every element of a string list
fn deserialize_vec_with_env<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let values = Vec::<String>::deserialize(deserializer)?;
    Ok(values.iter().map(|v| expand_env_vars(v)).collect())
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("No config path given: set {CONFIG_PATH_ENV} or pass --config")]
    MissingPath,

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Smoke test configuration
///
/// Loaded once per run and treated as immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeConfig {
    /// Platform API endpoint
    #[serde(deserialize_with = "deserialize_with_env")]
    pub api: String,
    /// Domain applications are routed under
    #[serde(deserialize_with = "deserialize_with_env")]
    pub apps_domain: String,
    #[serde(deserialize_with = "deserialize_with_env")]
    pub admin_user: String,
    #[serde(deserialize_with = "deserialize_with_env")]
    pub admin_password: String,
    #[serde(default)]
    pub skip_ssl_validation: bool,
    #[serde(default = "default_timeout_scale")]
    pub timeout_scale: f64,

    /// Marketplace offering under test
    #[serde(deserialize_with = "deserialize_with_env")]
    pub service_name: String,
    /// Plans exercised, in order
    #[serde(deserialize_with = "deserialize_vec_with_env")]
    pub plan_names: Vec<String>,
    /// Exported to the sample apps as `RABBITMQ_SKIP_SSL`
    #[serde(default)]
    pub rabbitmq_skip_ssl: bool,
    #[serde(default)]
    pub test_stomp: bool,
    #[serde(default)]
    pub test_mqtt: bool,

    #[serde(default)]
    pub cli: CliConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

fn default_timeout_scale() -> f64 {
    1.0
}

impl SmokeConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Load configuration from the file named by `CONFIG_PATH`
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigLoader::load_from_env()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("api", &self.api),
            ("apps_domain", &self.apps_domain),
            ("admin_user", &self.admin_user),
            ("service_name", &self.service_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "'{}' must not be empty",
                    field
                )));
            }
        }

        if self.plan_names.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one plan must be configured in 'plan_names'".into(),
            ));
        }

        if let Some(plan) = self.plan_names.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "Plan name '{}' is blank",
                plan
            )));
        }

        if !self.timeout_scale.is_finite() || self.timeout_scale <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid timeout_scale {}: must be a positive number",
                self.timeout_scale
            )));
        }

        if self.timeouts.retry_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts.retry_interval_secs must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Scale factor applied to every base timeout
    pub fn scale(&self) -> TimeoutScale {
        TimeoutScale::new(self.timeout_scale)
    }

    /// Route of a deployed application
    pub fn app_uri(&self, app_name: &str) -> String {
        format!("https://{}.{}", app_name, self.apps_domain)
    }

    /// Value exported to the sample apps as `RABBITMQ_SKIP_SSL`
    pub fn rabbitmq_skip_ssl_flag(&self) -> &'static str {
        if self.rabbitmq_skip_ssl {
            "1"
        } else {
            "0"
        }
    }
}

/// Platform CLI invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Executable name or path of the platform CLI
    #[serde(
        default = "default_cf_binary",
        deserialize_with = "deserialize_with_env"
    )]
    pub cf_binary: String,
    #[serde(default = "default_stack")]
    pub stack: String,
    #[serde(default = "default_app_memory")]
    pub app_memory: String,
    /// Directory holding the sample application bundles
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    /// Prefix of the org and space created for the run
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            cf_binary: default_cf_binary(),
            stack: default_stack(),
            app_memory: default_app_memory(),
            assets_dir: default_assets_dir(),
            name_prefix: default_name_prefix(),
        }
    }
}

fn default_cf_binary() -> String {
    "cf".to_string()
}

fn default_stack() -> String {
    "cflinuxfs2".to_string()
}

fn default_app_memory() -> String {
    "256M".to_string()
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("../assets")
}

fn default_name_prefix() -> String {
    "broker-smoke-test".to_string()
}

/// Base timeouts, before scaling by `timeout_scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// CLI steps and HTTP assertions. Default: 25
    #[serde(default = "default_timeout_secs")]
    pub default_secs: u64,

    /// Delay between HTTP polls. Not scaled. Default: 4
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// `set-env` and `start`, which stage the app. Default: 300
    #[serde(default = "default_start_secs")]
    pub start_secs: u64,

    /// Upper bound on a single HTTP request. Default: 30
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            default_secs: default_timeout_secs(),
            retry_interval_secs: default_retry_interval_secs(),
            start_secs: default_start_secs(),
            request_secs: default_request_secs(),
        }
    }
}

impl TimeoutsConfig {
    /// Policy for ordinary CLI steps and HTTP assertions
    pub fn default_policy(&self, scale: TimeoutScale) -> RetryPolicy {
        RetryPolicy::new(
            scale.apply(Duration::from_secs(self.default_secs)),
            Duration::from_secs(self.retry_interval_secs),
        )
    }

    /// Policy for staging the application
    pub fn start_policy(&self, scale: TimeoutScale) -> RetryPolicy {
        RetryPolicy::new(
            scale.apply(Duration::from_secs(self.start_secs)),
            Duration::from_secs(self.retry_interval_secs),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

fn default_timeout_secs() -> u64 {
    25
}

fn default_retry_interval_secs() -> u64 {
    4
}

fn default_start_secs() -> u64 {
    300
}

fn default_request_secs() -> u64 {
    30
}

#[cfg(test)]
pub(crate) fn test_config() -> SmokeConfig {
    SmokeConfig {
        api: "https://api.example.com".into(),
        apps_domain: "apps.example.com".into(),
        admin_user: "admin".into(),
        admin_password: "admin".into(),
        skip_ssl_validation: true,
        timeout_scale: 1.0,
        service_name: "p-rabbitmq".into(),
        plan_names: vec!["standard".into()],
        rabbitmq_skip_ssl: false,
        test_stomp: false,
        test_mqtt: false,
        cli: CliConfig::default(),
        timeouts: TimeoutsConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = TimeoutsConfig::default();
        assert_eq!(timeouts.default_secs, 25);
        assert_eq!(timeouts.retry_interval_secs, 4);
        assert_eq!(timeouts.start_secs, 300);
    }

    #[test]
    fn test_config_validation_empty_plans() {
        let mut config = test_config();
        config.plan_names.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_scale() {
        let mut config = test_config();
        config.timeout_scale = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_scale"));
    }

    #[test]
    fn test_config_validation_rejects_blank_service() {
        let mut config = test_config();
        config.service_name = "  ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("service_name"));
    }

    #[test]
    fn test_app_uri() {
        let config = test_config();
        assert_eq!(config.app_uri("abc"), "https://abc.apps.example.com");
    }

    #[test]
    fn test_rabbitmq_skip_ssl_flag() {
        let mut config = test_config();
        assert_eq!(config.rabbitmq_skip_ssl_flag(), "0");
        config.rabbitmq_skip_ssl = true;
        assert_eq!(config.rabbitmq_skip_ssl_flag(), "1");
    }

    #[test]
    fn test_scaled_policies() {
        let config = test_config();
        let scale = TimeoutScale::new(3.0);
        let policy = config.timeouts.default_policy(scale);
        assert_eq!(policy.timeout, Duration::from_secs(75));
        assert_eq!(policy.interval, Duration::from_secs(4));
        assert_eq!(
            config.timeouts.start_policy(scale).timeout,
            Duration::from_secs(900)
        );
    }

    #[test]
    fn test_env_value_with_json_metacharacters() {
        std::env::set_var("BROKER_SMOKE_UNIT_QUOTED", r#"pa"ss\word"#);
        let config: SmokeConfig = serde_json::from_value(serde_json::json!({
            "api": "https://api.example.com",
            "apps_domain": "apps.example.com",
            "admin_user": "admin",
            "admin_password": "${BROKER_SMOKE_UNIT_QUOTED}",
            "service_name": "p-rabbitmq",
            "plan_names": ["${BROKER_SMOKE_UNIT_PLAN:-standard}"]
        }))
        .unwrap();
        std::env::remove_var("BROKER_SMOKE_UNIT_QUOTED");

        assert_eq!(config.admin_password, r#"pa"ss\word"#);
        assert_eq!(config.plan_names, vec!["standard"]);
    }

    #[test]
    fn test_expand_with_default() {
        let expanded = expand_env_vars("${BROKER_SMOKE_SURELY_UNSET:-fallback}");
        assert_eq!(expanded, "fallback");
    }

    #[test]
    fn test_expand_keeps_unknown_placeholder() {
        let expanded = expand_env_vars("x-${BROKER_SMOKE_SURELY_UNSET}-y");
        assert_eq!(expanded, "x-${BROKER_SMOKE_SURELY_UNSET}-y");
    }
}
