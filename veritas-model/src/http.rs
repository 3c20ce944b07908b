//! Shared HTTP plumbing for remote generators.

use std::time::Duration;

use tracing::error;

use crate::error::{ModelError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn client(provider: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().map_err(|e| {
        ModelError::InvalidConfiguration(format!("{provider}: failed to build HTTP client: {e}"))
    })
}

pub(crate) fn request_error(provider: &str, e: &reqwest::Error) -> ModelError {
    ModelError::Request {
        provider: provider.to_string(),
        message: e.to_string(),
        retryable: e.is_timeout() || e.is_connect(),
    }
}

/// Turn a non-success response into an error, keeping the body as detail.
///
/// Rate limits and server errors are retryable; other statuses mean the
/// request itself is wrong.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(provider, %status, "generation request rejected");
    let message = format!("API returned {status}: {}", body.trim());
    if status.as_u16() == 429 || status.is_server_error() {
        Err(ModelError::Request { provider: provider.to_string(), message, retryable: true })
    } else {
        Err(ModelError::Generation { provider: provider.to_string(), message })
    }
}
