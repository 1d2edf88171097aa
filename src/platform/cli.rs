//! `cf` process runner

use super::{display_command, CommandOutput, Platform, PlatformError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs the platform CLI as a child process.
///
/// When a home directory is set it is exported as `CF_HOME`, so concurrent
/// suite runs on one machine keep separate CLI sessions.
#[derive(Debug, Clone)]
pub struct CfCli {
    binary: String,
    home: Option<PathBuf>,
}

impl CfCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            home: None,
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }
}

#[async_trait]
impl Platform for CfCli {
    #[tracing::instrument(
        name = "cf",
        skip(self, args),
        fields(
            command = %display_command(args),
            exit_code = tracing::field::Empty
        ),
        err
    )]
    async fn execute(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, PlatformError> {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(home) = &self.home {
            command.env("CF_HOME", home);
        }

        let child = command.spawn().map_err(|source| PlatformError::Spawn {
            command: display_command(args),
            source,
        })?;

        // Dropping the wait future on timeout kills the child.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| PlatformError::Spawn {
                command: display_command(args),
                source,
            })?,
            Err(_) => {
                return Err(PlatformError::Timeout {
                    command: display_command(args),
                    after: timeout,
                })
            }
        };

        let code = output.status.code();
        tracing::Span::current().record("exit_code", code.unwrap_or(-1));

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        tracing::debug!(stdout = %stdout.trim_end(), "cf finished");

        Ok(CommandOutput {
            code,
            stdout,
            stderr,
        })
    }
}

/// Scratch `CF_HOME` directory for one suite run
#[derive(Debug)]
pub struct CliHome {
    path: PathBuf,
}

impl CliHome {
    /// Create `<tmp>/<prefix>-<uuid>`
    pub async fn create(prefix: &str) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the directory and everything the CLI wrote to it
    pub async fn remove(self) -> std::io::Result<()> {
        tokio::fs::remove_dir_all(&self.path).await
    }
}
