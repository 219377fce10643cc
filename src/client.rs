//! A thin async client for the Sandbox-over-Service HTTP control plane.
//!
//! One method per route. Network-layer failures (connection refused, DNS,
//! timeout) are safe for a caller to retry; a 4xx/5xx response means the
//! engine observed a definite outcome and should not be retried blindly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("sandbox engine returned {status}: {error} ({detail})")]
    Engine {
        status: reqwest::StatusCode,
        error: String,
        detail: String,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    detail: String,
}

#[derive(Debug, Serialize)]
struct CreateSandboxRequest<'a> {
    image: &'a str,
    setup_commands: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct CreateSandboxResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SandboxListEntry {
    pub id: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
struct ExecRequest<'a> {
    command: &'a str,
    standalone: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExecResponse {
    pub output: String,
    pub exit_code: i64,
}

#[derive(Debug, Serialize)]
struct StopRequest {
    remove: bool,
}

/// A client bound to one sandbox engine's base URL.
pub struct SandboxClient {
    http: reqwest::Client,
    base_url: String,
}

impl SandboxClient {
    /// Builds a client against `base_url` (e.g. `http://127.0.0.1:8080`)
    /// with the default 120-second per-request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client configuration is valid"),
            base_url: base_url.into(),
        }
    }

    pub async fn create_sandbox(
        &self,
        image: &str,
        setup_commands: &[String],
    ) -> Result<CreateSandboxResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/sandboxes", self.base_url))
            .json(&CreateSandboxRequest {
                image,
                setup_commands,
            })
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn list_sandboxes(&self) -> Result<Vec<SandboxListEntry>, ClientError> {
        let response = self
            .http
            .get(format!("{}/sandboxes", self.base_url))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn start_sandbox(&self, id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/sandboxes/{id}/start", self.base_url))
            .send()
            .await?;
        Self::check_status(response).await
    }

    pub async fn exec(
        &self,
        id: &str,
        command: &str,
        standalone: bool,
    ) -> Result<ExecResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/sandboxes/{id}/exec", self.base_url))
            .json(&ExecRequest { command, standalone })
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn stop_sandbox(&self, id: &str, remove: bool) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/sandboxes/{id}/stop", self.base_url))
            .json(&StopRequest { remove })
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn parse<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::engine_error(status, response).await)
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<(), ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::engine_error(status, response).await)
        }
    }

    async fn engine_error(status: reqwest::StatusCode, response: reqwest::Response) -> ClientError {
        match response.json::<ErrorBody>().await {
            Ok(body) => ClientError::Engine {
                status,
                error: body.error,
                detail: body.detail,
            },
            Err(_) => ClientError::Engine {
                status,
                error: "unknown".to_string(),
                detail: "non-JSON error response".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_default_timeout() {
        let _client = SandboxClient::new("http://127.0.0.1:8080");
    }

    #[test]
    fn client_builds_with_custom_timeout() {
        let _client = SandboxClient::with_timeout("http://127.0.0.1:8080", Duration::from_secs(5));
    }
}
