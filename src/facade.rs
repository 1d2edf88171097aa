//! HTTP client for the sample application's broker façade
//!
//! The sample apps bound to a service instance expose a tiny HTTP API that
//! forwards to the broker over AMQP, STOMP or MQTT:
//!
//! | Request | Form field | Success body |
//! |---------|------------|--------------|
//! | `GET /ping` | | contains `OK` |
//! | `POST /queues` | `name` | contains `SUCCESS` |
//! | `GET /queues` | | one queue name per line |
//! | `PUT /queue/{name}` | `data` | contains `SUCCESS` |
//! | `GET /queue/{name}` | | next message, or empty with a 2xx status |
//!
//! Each method performs exactly one request and returns the response body
//! (`read_reply` also keeps the status); judging it is left to the caller's
//! retrying assertion.

use std::time::Duration;
use thiserror::Error;

/// Façade client errors
#[derive(Error, Debug)]
pub enum FacadeError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Client configuration error: {0}")]
    Client(String),
}

/// Maps an application name to the base URL it is served at
pub trait AppLocator: Send + Sync {
    fn app_url(&self, app_name: &str) -> String;
}

impl AppLocator for crate::config::SmokeConfig {
    fn app_url(&self, app_name: &str) -> String {
        self.app_uri(app_name)
    }
}

/// Client for one deployed sample application
#[derive(Debug, Clone)]
pub struct AppClient {
    base_url: String,
    http: reqwest::Client,
}

impl AppClient {
    /// Create a client for the app served at `base_url`.
    ///
    /// `accept_invalid_certs` mirrors `curl -k`, for platforms with
    /// self-signed router certificates.
    pub fn new(
        base_url: impl Into<String>,
        accept_invalid_certs: bool,
        request_timeout: Duration,
    ) -> Result<Self, FacadeError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .timeout(request_timeout)
            .build()
            .map_err(|e| FacadeError::Client(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /ping`
    #[tracing::instrument(name = "facade.ping", skip(self), fields(app = %self.base_url), err)]
    pub async fn ping(&self) -> Result<String, FacadeError> {
        self.read_body(self.http.get(self.url("/ping"))).await
    }

    /// `POST /queues` with `name=<queue>`
    #[tracing::instrument(name = "facade.create_queue", skip(self), fields(app = %self.base_url), err)]
    pub async fn create_queue(&self, queue: &str) -> Result<String, FacadeError> {
        self.read_body(self.http.post(self.url("/queues")).form(&[("name", queue)]))
            .await
    }

    /// `GET /queues`
    #[tracing::instrument(name = "facade.list_queues", skip(self), fields(app = %self.base_url), err)]
    pub async fn list_queues(&self) -> Result<String, FacadeError> {
        self.read_body(self.http.get(self.url("/queues"))).await
    }

    /// `PUT /queue/{queue}` with `data=<message>`
    #[tracing::instrument(name = "facade.publish", skip(self, message), fields(app = %self.base_url), err)]
    pub async fn publish(&self, queue: &str, message: &str) -> Result<String, FacadeError> {
        self.read_body(
            self.http
                .put(self.url(&format!("/queue/{}", queue)))
                .form(&[("data", message)]),
        )
        .await
    }

    /// `GET /queue/{queue}`
    pub async fn read(&self, queue: &str) -> Result<String, FacadeError> {
        Ok(self.read_reply(queue).await?.body)
    }

    /// `GET /queue/{queue}`, keeping the status code
    #[tracing::instrument(name = "facade.read", skip(self), fields(app = %self.base_url), err)]
    pub async fn read_reply(&self, queue: &str) -> Result<Reply, FacadeError> {
        self.send(self.http.get(self.url(&format!("/queue/{}", queue))))
            .await
    }

    // Status codes are not judged here: the apps answer 204 for an empty
    // queue and some error pages still carry useful text.
    async fn read_body(&self, request: reqwest::RequestBuilder) -> Result<String, FacadeError> {
        Ok(self.send(request).await?.body)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Reply, FacadeError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(status, body = %body, "facade response");
        Ok(Reply { status, body })
    }
}

/// Status and body of one façade response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 2xx with nothing but whitespace in the body
    pub fn is_empty_success(&self) -> bool {
        self.is_success() && self.body.trim().is_empty()
    }
}

/// Whether a `GET /queues` body lists `queue` on a line of its own
pub fn lists_queue(body: &str, queue: &str) -> bool {
    body.lines().any(|line| line.trim() == queue)
}
