//! Asset fetching over HTTP, with `data:` URLs decoded locally.

use super::http::{build_http_client, send};
use super::{decode_data_url, AssetFetcher};
use crate::errors::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const PROVIDER: &str = "fetch";

/// Fetches export assets.
#[derive(Clone, Debug)]
pub struct HttpAssetFetcher {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpAssetFetcher {
    /// Creates a fetcher with an optional per-request timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            timeout,
        })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        if let Some(decoded) = decode_data_url(url) {
            return decoded
                .map(|d| d.bytes)
                .map_err(|e| ProviderError::invalid_response(PROVIDER, e));
        }

        let response = send(PROVIDER, self.timeout, self.client.get(url)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::encode_data_url;

    #[tokio::test]
    async fn test_fetch_data_url_without_network() {
        let fetcher = HttpAssetFetcher::new(None).unwrap();
        let url = encode_data_url("audio/mpeg", b"abc");
        assert_eq!(fetcher.fetch(&url).await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_fetch_bad_data_url() {
        let fetcher = HttpAssetFetcher::new(None).unwrap();
        let err = fetcher.fetch("data:image/png;base64,%%").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }
}
