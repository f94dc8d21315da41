//! Receipt extraction: heuristic parsing and remote response normalization.

mod normalizer;
mod parser;
pub mod patterns;

pub use normalizer::LlmResponseNormalizer;
pub use parser::{HeuristicReceiptParser, UNKNOWN_STORE};

use crate::error::ExtractionError;
use crate::models::receipt::ReceiptData;
use crate::ocr::OcrResult;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Outcome of parsing one receipt text.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted receipt.
    pub receipt: ReceiptData,
    /// Text the receipt was parsed from.
    pub raw_text: String,
    /// Fields that had to be defaulted.
    pub warnings: Vec<String>,
    /// Priced lines dropped because their name was too short.
    pub discarded_lines: usize,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for text-to-receipt parsers.
///
/// Parsing is total: any input yields a receipt, defaulting what it cannot
/// find.
pub trait ReceiptParser {
    /// Parse a receipt from plain text.
    fn parse(&self, text: &str) -> ReceiptData;

    /// Parse a receipt from an OCR result.
    fn parse_ocr(&self, ocr_result: &OcrResult) -> ReceiptData {
        self.parse(&ocr_result.text)
    }
}
