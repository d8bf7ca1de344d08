//! Shared reqwest plumbing for the HTTP providers.

use crate::errors::ProviderError;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds a client with an optional whole-request timeout.
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client, ProviderError> {
    let mut builder = Client::builder().user_agent(concat!("studioflow/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| ProviderError::transport("http", e.to_string()))
}

pub(crate) fn map_reqwest_error(
    provider: &str,
    timeout: Option<Duration>,
    err: &reqwest::Error,
) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            provider: provider.to_string(),
            seconds: timeout.map_or(0, |t| t.as_secs()),
        }
    } else {
        ProviderError::transport(provider, err.to_string())
    }
}

/// Sends a request and returns the response if its status is a success.
pub(crate) async fn send(
    provider: &str,
    timeout: Option<Duration>,
    request: RequestBuilder,
) -> Result<Response, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| map_reqwest_error(provider, timeout, &e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ProviderError::http(provider, status.as_u16(), body))
}

/// Sends a request and decodes a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    timeout: Option<Duration>,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = send(provider, timeout, request).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::invalid_response(provider, e.to_string()))
}

pub(crate) fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}
