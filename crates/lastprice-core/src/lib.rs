//! Core library for receipt scanning.
//!
//! This crate provides:
//! - OCR text cleanup and prompt formatting
//! - Heuristic receipt parsing (store, date, line items, total)
//! - Normalization of remote language-model responses into receipts
//! - Local persistence of the saved receipt collection
//! - An OCR collaborator port with a pure Rust implementation

pub mod error;
pub mod ids;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod receipt;
pub mod remote;
pub mod storage;
pub mod text;

pub use error::{LastPriceError, Result};
pub use ids::{Clock, FixedClock, IdGenerator, SequentialIds, SystemClock, TimestampIds};
pub use models::receipt::{ReceiptData, ReceiptItem};
pub use ocr::{OcrResult, TextRecognizer};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pipeline::ReceiptScanner;
pub use receipt::{ExtractionResult, HeuristicReceiptParser, LlmResponseNormalizer, ReceiptParser};
pub use remote::RemoteExtractor;
pub use storage::{FileStore, KeyValueStore, MemoryStore, ReceiptStore};
pub use text::{format_for_llm, preprocess, PreprocessPolicy};
