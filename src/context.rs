//! Suite workspace on the platform
//!
//! Before any scenario runs, the CLI is pointed at the platform API,
//! authenticated, and targeted at a throwaway org and space so apps and
//! service instances from concurrent runs never meet. The org (and with it
//! everything left inside) is deleted when the run ends.

use std::time::Duration;
use thiserror::Error;

use crate::config::SmokeConfig;
use crate::lifecycle::random_name;
use crate::platform::{Platform, PlatformError};

/// Suite context errors
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Suite setup failed at '{stage}': {source}")]
    Setup {
        stage: &'static str,
        #[source]
        source: PlatformError,
    },

    #[error("Suite teardown failed: {0}")]
    Teardown(#[source] PlatformError),
}

/// Org and space owned by one suite run
#[derive(Debug, Clone)]
pub struct SuiteContext {
    org: String,
    space: String,
    org_created: bool,
}

impl SuiteContext {
    /// Fresh names: `<prefix>-ORG-<uuid>` and `<prefix>-SPACE-<uuid>`
    pub fn new(prefix: &str) -> Self {
        Self {
            org: format!("{}-ORG-{}", prefix, random_name()),
            space: format!("{}-SPACE-{}", prefix, random_name()),
            org_created: false,
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    /// Target the API, log in, and create and target the org and space.
    #[tracing::instrument(name = "suite.setup", skip_all, fields(org = %self.org, space = %self.space), err)]
    pub async fn setup(
        &mut self,
        platform: &dyn Platform,
        config: &SmokeConfig,
        timeout: Duration,
    ) -> Result<(), ContextError> {
        let mut api = vec!["api", config.api.as_str()];
        if config.skip_ssl_validation {
            api.push("--skip-ssl-validation");
        }
        run(platform, "api", &api, timeout).await?;
        run(
            platform,
            "auth",
            &["auth", config.admin_user.as_str(), config.admin_password.as_str()],
            timeout,
        )
        .await?;

        run(platform, "create-org", &["create-org", self.org.as_str()], timeout).await?;
        self.org_created = true;

        run(
            platform,
            "create-space",
            &["create-space", "-o", self.org.as_str(), self.space.as_str()],
            timeout,
        )
        .await?;
        run(
            platform,
            "target",
            &["target", "-o", self.org.as_str(), "-s", self.space.as_str()],
            timeout,
        )
        .await?;

        tracing::info!("suite workspace ready");
        Ok(())
    }

    /// Delete the org if setup got as far as creating it.
    #[tracing::instrument(name = "suite.teardown", skip_all, fields(org = %self.org), err)]
    pub async fn teardown(
        &self,
        platform: &dyn Platform,
        timeout: Duration,
    ) -> Result<(), ContextError> {
        if !self.org_created {
            tracing::debug!("org was never created, nothing to delete");
            return Ok(());
        }
        platform
            .cf(&["delete-org", "-f", self.org.as_str()], timeout)
            .await
            .map_err(ContextError::Teardown)?;
        Ok(())
    }
}

async fn run(
    platform: &dyn Platform,
    stage: &'static str,
    args: &[&str],
    timeout: Duration,
) -> Result<(), ContextError> {
    platform
        .cf(args, timeout)
        .await
        .map(|_| ())
        .map_err(|source| ContextError::Setup { stage, source })
}
