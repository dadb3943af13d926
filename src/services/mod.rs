//! HTTP clients for the remote collaborators.
//!
//! Both clients are cheap to clone so request futures can be moved onto their own tasks.

mod backend;
mod esign;

pub use backend::BackendClient;
pub use esign::{EnvelopeDefinition, SignatureClient};

use crate::error::ServiceError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Build the shared reqwest client. No request timeout is set; requests settle on their own.
pub(crate) fn build_http(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .context("build HTTP client")
}

/// Turn a response into `T`, mapping non-2xx and undecodable bodies to typed errors.
pub(crate) async fn read_json<T: DeserializeOwned>(
    endpoint: &'static str,
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ServiceError::Status { endpoint, status });
    }
    let body = resp
        .bytes()
        .await
        .map_err(|e| ServiceError::transport(endpoint, e))?;
    serde_json::from_slice(&body).map_err(|source| ServiceError::MalformedBody { endpoint, source })
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::join_url;

    #[test]
    fn join_url_normalises_slashes() {
        assert_eq!(join_url("http://h:1/", "/ask"), "http://h:1/ask");
        assert_eq!(join_url("http://h:1", "ask"), "http://h:1/ask");
    }
}
