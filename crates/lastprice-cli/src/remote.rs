//! HTTP client for the remote extraction service.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use lastprice_core::error::RemoteError;
use lastprice_core::remote::{ExtractionRequest, RemoteExtractor};

/// Posts `{"prompt": ...}` to an endpoint and returns the JSON it answers.
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExtractor {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, RemoteError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(RemoteError::NotConfigured);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("lastprice-cli/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl RemoteExtractor for HttpExtractor {
    fn name(&self) -> &str {
        "http"
    }

    async fn extract(&self, prompt: &str) -> Result<Value, RemoteError> {
        let request = ExtractionRequest {
            prompt: prompt.to_string(),
        };

        debug!("POST {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!("Remote extraction failed with HTTP {}", status);
            return Err(RemoteError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RemoteError::Body(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_endpoint_is_not_configured() {
        assert!(matches!(
            HttpExtractor::new("  ", 60),
            Err(RemoteError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // port 9 (discard) on localhost is not expected to accept HTTP
        let extractor = HttpExtractor::new("http://127.0.0.1:9/extract", 2).unwrap();
        let err = extractor.extract("prompt").await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
