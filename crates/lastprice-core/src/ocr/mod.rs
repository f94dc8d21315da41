//! OCR collaborator: receipt image in, recognized text out.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CaptureError, OcrError};

/// Image extensions accepted for receipt capture.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tiff", "bmp", "webp"];

/// Result of OCR processing on a receipt image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResult {
    /// Recognized text, one line per detected text region.
    pub text: String,

    /// Number of text regions recognized.
    #[serde(default)]
    pub line_count: usize,

    /// Processing time in milliseconds.
    #[serde(default)]
    pub processing_time_ms: u64,
}

impl OcrResult {
    /// Wrap plain text, e.g. text typed in or read from a file.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let text = text.trim().to_string();
        Self {
            line_count: text.lines().filter(|l| !l.trim().is_empty()).count(),
            text,
            processing_time_ms: 0,
        }
    }

    /// Whether no text was recognized.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Anything that can turn a receipt image into text.
pub trait TextRecognizer {
    /// Recognize the text on an image.
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError>;
}

/// Load a receipt image from disk.
pub fn load_image(path: &Path) -> Result<DynamicImage, CaptureError> {
    if !path.exists() {
        return Err(CaptureError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(CaptureError::UnsupportedFormat(extension));
    }

    let image = image::open(path)?;
    debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedRecognizer(&'static str);

    impl TextRecognizer for CannedRecognizer {
        fn recognize(&self, _image: &DynamicImage) -> Result<OcrResult, OcrError> {
            Ok(OcrResult::from_text(self.0))
        }
    }

    #[test]
    fn test_from_text_trims() {
        let result = OcrResult::from_text("\n  Store A\n\nMilk 3.50  \n");
        assert_eq!(result.text, "Store A\n\nMilk 3.50");
        assert_eq!(result.line_count, 2);
        assert!(!result.is_empty());
        assert!(OcrResult::from_text(" \n ").is_empty());
    }

    #[test]
    fn test_recognizer_trait_object() {
        let recognizer: Box<dyn TextRecognizer> = Box::new(CannedRecognizer("Shop\nTea 1.20"));
        let result = recognizer.recognize(&DynamicImage::new_rgb8(4, 4)).unwrap();
        assert_eq!(result.line_count, 2);
    }

    #[test]
    fn test_load_missing_image() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, CaptureError::NotFound(_)));
    }

    #[test]
    fn test_load_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.txt");
        std::fs::write(&path, "Store A").unwrap();

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedFormat(ref ext) if ext == "txt"));
    }

    #[test]
    fn test_load_corrupt_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, b"not a png").unwrap();

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, CaptureError::Decode(_)));
    }

    #[test]
    fn test_load_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        DynamicImage::new_rgb8(8, 6).save(&path).unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
    }
}
