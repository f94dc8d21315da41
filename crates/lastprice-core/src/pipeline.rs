//! Scan pipeline: image or text in, receipt out.

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::{LastPriceError, OcrError, Result};
use crate::ids::{Clock, IdGenerator, SystemClock, TimestampIds};
use crate::models::config::ExtractionConfig;
use crate::models::receipt::ReceiptData;
use crate::ocr::{OcrResult, TextRecognizer};
use crate::receipt::{ExtractionResult, HeuristicReceiptParser, LlmResponseNormalizer};
use crate::remote::RemoteExtractor;
use crate::text::{format_for_llm_with, preprocess_with, PreprocessPolicy};

/// Ties OCR, preprocessing, and both extraction paths together.
///
/// The heuristic parser and the normalizer share one clock and one id
/// generator, so receipts from either path never share an id.
pub struct ReceiptScanner {
    parser: HeuristicReceiptParser,
    normalizer: LlmResponseNormalizer,
    policy: PreprocessPolicy,
    preprocess_before_parse: bool,
}

impl ReceiptScanner {
    /// Scanner with default settings, wall clock, and timestamp ids.
    pub fn new() -> Self {
        Self::with_services(Arc::new(SystemClock), Arc::new(TimestampIds::new()))
    }

    /// Scanner using the given clock and id generator.
    pub fn with_services(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            parser: HeuristicReceiptParser::new()
                .with_clock(Arc::clone(&clock))
                .with_ids(Arc::clone(&ids)),
            normalizer: LlmResponseNormalizer::new().with_clock(clock).with_ids(ids),
            policy: PreprocessPolicy::default(),
            preprocess_before_parse: false,
        }
    }

    /// Apply extraction settings.
    pub fn with_config(mut self, config: &ExtractionConfig) -> Self {
        self.policy = config.preprocess_policy();
        self.preprocess_before_parse = config.preprocess_before_parse;
        self.parser = self
            .parser
            .with_unknown_store_label(config.unknown_store_label.clone());
        self
    }

    /// Run OCR on an image.
    pub fn recognize(
        &self,
        recognizer: &dyn TextRecognizer,
        image: &DynamicImage,
    ) -> std::result::Result<OcrResult, OcrError> {
        let result = recognizer.recognize(image)?;
        if result.is_empty() {
            return Err(OcrError::NoText);
        }
        info!(
            "Recognized {} lines in {}ms",
            result.line_count, result.processing_time_ms
        );
        Ok(result)
    }

    /// Parse OCR text with the heuristic parser.
    pub fn scan_text(&self, text: &str) -> ExtractionResult {
        if self.preprocess_before_parse {
            let cleaned = preprocess_with(text, self.policy);
            debug!("Preprocessed {} chars into {}", text.len(), cleaned.len());
            self.parser.parse_with_report(&cleaned)
        } else {
            self.parser.parse_with_report(text.trim())
        }
    }

    /// Run OCR on an image, then parse with the heuristic parser.
    pub fn scan_image(
        &self,
        recognizer: &dyn TextRecognizer,
        image: &DynamicImage,
    ) -> Result<ExtractionResult> {
        let ocr = self.recognize(recognizer, image)?;
        Ok(self.scan_text(&ocr.text))
    }

    /// Prompt that would be sent for this text.
    pub fn prompt_for(&self, text: &str) -> String {
        format_for_llm_with(text, self.policy)
    }

    /// Send cleaned text to a remote extractor and normalize its answer.
    pub async fn scan_text_remote(
        &self,
        text: &str,
        remote: &dyn RemoteExtractor,
    ) -> Result<ReceiptData> {
        let prompt = self.prompt_for(text);
        info!(
            "Requesting remote extraction from {} ({} chars)",
            remote.name(),
            prompt.len()
        );

        let response = remote.extract(&prompt).await?;
        self.normalizer
            .normalize(&response)
            .map_err(LastPriceError::from)
    }
}

impl Default for ReceiptScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, RemoteError};
    use crate::ids::{FixedClock, SequentialIds};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    const RECEIPT: &str = "Store A\n01/02/2024\nMilk 3,50\nBread 2.20\nTOTAL 5.70\n";

    fn scanner() -> ReceiptScanner {
        ReceiptScanner::with_services(
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap())),
            Arc::new(SequentialIds::starting_at(1)),
        )
    }

    struct CannedRemote {
        response: Value,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedRemote {
        fn new(response: Value) -> Self {
            Self {
                response,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteExtractor for CannedRemote {
        fn name(&self) -> &str {
            "canned"
        }

        async fn extract(&self, prompt: &str) -> std::result::Result<Value, RemoteError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    struct FailingRemote;

    #[async_trait]
    impl RemoteExtractor for FailingRemote {
        fn name(&self) -> &str {
            "failing"
        }

        async fn extract(&self, _prompt: &str) -> std::result::Result<Value, RemoteError> {
            Err(RemoteError::Status(503))
        }
    }

    struct CannedRecognizer(&'static str);

    impl TextRecognizer for CannedRecognizer {
        fn recognize(&self, _image: &DynamicImage) -> std::result::Result<OcrResult, OcrError> {
            Ok(OcrResult::from_text(self.0))
        }
    }

    #[test]
    fn test_scan_text_keeps_raw_text_for_parser() {
        let result = scanner().scan_text(RECEIPT);

        // the date survives because raw text is parsed
        assert_eq!(result.receipt.date, "01/02/2024");
        assert_eq!(result.receipt.total, Some(Decimal::new(570, 2)));
        // "3,50" is not a dot decimal, so Milk is not an item
        assert_eq!(result.receipt.items.len(), 1);
    }

    #[test]
    fn test_scan_text_with_preprocessing() {
        let config = ExtractionConfig {
            preprocess_before_parse: true,
            ..ExtractionConfig::default()
        };
        let result = scanner().with_config(&config).scan_text(RECEIPT);

        let names: Vec<&str> = result.receipt.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Milk", "Bread"]);
        // slashes are stripped by preprocessing
        assert_ne!(result.receipt.date, "01/02/2024");
    }

    #[test]
    fn test_scan_image() {
        let recognizer = CannedRecognizer(RECEIPT);
        let result = scanner()
            .scan_image(&recognizer, &DynamicImage::new_rgb8(2, 2))
            .unwrap();
        assert_eq!(result.receipt.store, "Store A");
    }

    #[test]
    fn test_scan_image_without_text() {
        let recognizer = CannedRecognizer("   ");
        let err = scanner()
            .scan_image(&recognizer, &DynamicImage::new_rgb8(2, 2))
            .unwrap_err();
        assert!(matches!(err, LastPriceError::Ocr(OcrError::NoText)));
    }

    #[tokio::test]
    async fn test_scan_text_remote() {
        let remote = CannedRemote::new(json!([
            {"name": "Milk", "price": 3.5},
            {"name": "Bread", "price": 2.2}
        ]));

        let receipt = scanner().scan_text_remote(RECEIPT, &remote).await.unwrap();

        assert_eq!(receipt.total, Some(Decimal::new(57, 1)));
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.store, "");

        let prompts = remote.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            "Extract items and prices from this receipt OCR output:\n\
             - Store A\n- 01022024\n- Milk 3.50\n- Bread 2.20\n- TOTAL 5.70"
        );
    }

    #[tokio::test]
    async fn test_scan_text_remote_shape_failure() {
        let remote = CannedRemote::new(json!({"raw": "cannot parse"}));

        let err = scanner().scan_text_remote(RECEIPT, &remote).await.unwrap_err();
        assert!(matches!(
            err,
            LastPriceError::Extraction(ExtractionError::UnexpectedShape { .. })
        ));
    }

    #[tokio::test]
    async fn test_scan_text_remote_transport_failure() {
        let err = scanner()
            .scan_text_remote(RECEIPT, &FailingRemote)
            .await
            .unwrap_err();
        assert!(matches!(err, LastPriceError::Remote(RemoteError::Status(503))));
    }

    #[tokio::test]
    async fn test_ids_shared_across_paths() {
        let scanner = scanner();
        let remote = CannedRemote::new(json!([]));

        let first = scanner.scan_text("Shop").receipt;
        let second = scanner.scan_text_remote("Shop", &remote).await.unwrap();
        assert_ne!(first.id, second.id);
    }
}
