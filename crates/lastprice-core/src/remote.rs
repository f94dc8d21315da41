//! Remote extraction collaborator port.
//!
//! A remote text-understanding service receives `{"prompt": "..."}` and is
//! expected to answer with an array of `{name, price}` objects, or with an
//! object carrying a `raw` diagnostic when it could not comply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

/// Request body sent to the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub prompt: String,
}

/// Remote service turning a prompt into structured item JSON.
#[async_trait]
pub trait RemoteExtractor: Send + Sync {
    /// Short name for logs (e.g. "http").
    fn name(&self) -> &str;

    /// Send the prompt and return the decoded JSON response, whatever its
    /// shape.
    async fn extract(&self, prompt: &str) -> Result<Value, RemoteError>;
}
