//! Error types for the lastprice-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the lastprice library.
#[derive(Error, Debug)]
pub enum LastPriceError {
    /// The receipt image could not be obtained.
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Receipt extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Remote extraction service error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Persistence error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while loading a receipt image.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The image file does not exist.
    #[error("image not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension is not a supported image format.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The image could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Recognition finished but produced no text.
    #[error("no text detected in image")]
    NoText,
}

/// Errors related to receipt extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The remote response is not an ordered sequence of items.
    #[error("unexpected response shape: expected an array of items, got {found}")]
    UnexpectedShape {
        /// JSON type that was received instead.
        found: &'static str,
        /// `raw` diagnostic field, when the service provided one.
        raw: Option<String>,
    },
}

/// Errors raised by the remote extraction collaborator.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// No endpoint was configured for remote extraction.
    #[error("no remote extraction endpoint configured")]
    NotConfigured,

    /// The request could not be delivered.
    #[error("request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned HTTP {0}")]
    Status(u16),

    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    Body(String),
}

/// Errors related to the receipt collection in local storage.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing store failed.
    #[error("storage I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The stored collection is not valid receipt JSON.
    #[error("stored data under key {key} is corrupt: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The collection could not be serialized.
    #[error("failed to encode receipts: {0}")]
    Encode(#[source] serde_json::Error),

    /// The key cannot be mapped onto the backing store.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Result type for the lastprice library.
pub type Result<T> = std::result::Result<T, LastPriceError>;
