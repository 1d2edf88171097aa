//! Platform CLI module
//!
//! Every provisioning step is a single invocation of the platform CLI whose
//! exit code decides success. The [`Platform`] trait is the seam between the
//! orchestrator and the real `cf` binary, which lets tests script the CLI.
//!
//! # Example
//!
//! ```no_run
//! use broker_smoke_tests::platform::{CfCli, Platform};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cli = CfCli::new("cf");
//! cli.cf(&["apps"], Duration::from_secs(25)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

mod cli;

pub use cli::{CfCli, CliHome};

/// Platform CLI errors
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {}: {stderr}", .code.map_or("signal".to_string(), |c| format!("code {}", c)))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{command}' did not finish within {after:?}")]
    Timeout { command: String, after: Duration },
}

/// Captured result of one CLI invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A platform CLI
#[async_trait]
pub trait Platform: Send + Sync {
    /// Run the CLI once with `args`, waiting at most `timeout`.
    ///
    /// Returns the captured output whatever the exit code; only spawn
    /// failures and timeouts are errors.
    async fn execute(&self, args: &[String], timeout: Duration)
        -> Result<CommandOutput, PlatformError>;

    /// Run the CLI and require exit code 0
    async fn cf(&self, args: &[&str], timeout: Duration) -> Result<CommandOutput, PlatformError> {
        let owned: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let output = self.execute(&owned, timeout).await?;

        if output.is_success() {
            Ok(output)
        } else {
            Err(PlatformError::NonZeroExit {
                command: display_command(&owned),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Render a command line for logs and errors, hiding credentials.
pub fn display_command(args: &[String]) -> String {
    match args.first().map(String::as_str) {
        Some("auth") if args.len() > 2 => format!("auth {} ********", args[1]),
        _ => args.join(" "),
    }
}
