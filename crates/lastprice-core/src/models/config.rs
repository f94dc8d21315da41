//! Configuration structures for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::LastPriceError;
use crate::text::PreprocessPolicy;

/// Main configuration for lastprice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastPriceConfig {
    /// Receipt extraction configuration.
    pub extraction: ExtractionConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Remote extraction service configuration.
    pub remote: RemoteConfig,

    /// Local storage configuration.
    pub storage: StorageConfig,
}

/// Receipt extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Clean OCR text before heuristic parsing, not only before remote
    /// extraction. Cleaning strips `/`, so slashed dates are lost.
    pub preprocess_before_parse: bool,

    /// Read `12,99` as `12.99`.
    pub comma_decimals: bool,

    /// Read `12 99` as `12.99`.
    pub merge_split_decimals: bool,

    /// Store name used when the text has no lines at all.
    pub unknown_store_label: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            preprocess_before_parse: false,
            comma_decimals: true,
            merge_split_decimals: true,
            unknown_store_label: "Unknown Store".to_string(),
        }
    }
}

impl ExtractionConfig {
    /// Preprocessing policy derived from this configuration.
    pub fn preprocess_policy(&self) -> PreprocessPolicy {
        PreprocessPolicy {
            comma_decimals: self.comma_decimals,
            merge_split_decimals: self.merge_split_decimals,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` markers for glyphs the recognizer could not map.
    pub keep_unknown_glyphs: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unknown_glyphs: false,
        }
    }
}

/// Remote extraction service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// URL receiving `{"prompt": "..."}` POST requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 60,
        }
    }
}

/// Local storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding stored collections (platform data dir if unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Key of the saved receipt collection.
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            key: "saved_receipts".to_string(),
        }
    }
}

impl LastPriceConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> crate::Result<()> {
        if self.remote.timeout_secs == 0 {
            return Err(LastPriceError::Config(
                "remote.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(endpoint) = &self.remote.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(LastPriceError::Config(format!(
                    "remote.endpoint must be an http(s) URL, got {:?}",
                    endpoint
                )));
            }
        }

        let key = &self.storage.key;
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(LastPriceError::Config(format!(
                "storage.key may only contain letters, digits, '_' and '-', got {:?}",
                key
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: LastPriceConfig =
            serde_json::from_str(r#"{"remote": {"endpoint": "http://localhost:8080/extract"}}"#)
                .unwrap();

        assert_eq!(
            config.remote.endpoint.as_deref(),
            Some("http://localhost:8080/extract")
        );
        assert_eq!(config.remote.timeout_secs, 60);
        assert_eq!(config.storage.key, "saved_receipts");
        assert_eq!(config.extraction, ExtractionConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = LastPriceConfig::default();
        config.extraction.merge_split_decimals = false;
        config.save(&path).unwrap();

        let loaded = LastPriceConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!loaded.extraction.preprocess_policy().merge_split_decimals);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let err = LastPriceConfig::from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_validate() {
        assert!(LastPriceConfig::default().validate().is_ok());

        let mut config = LastPriceConfig::default();
        config.remote.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(LastPriceError::Config(_))));

        let mut config = LastPriceConfig::default();
        config.remote.endpoint = Some("localhost:8080".to_string());
        assert!(matches!(config.validate(), Err(LastPriceError::Config(_))));

        let mut config = LastPriceConfig::default();
        config.storage.key = "../receipts".to_string();
        assert!(matches!(config.validate(), Err(LastPriceError::Config(_))));
    }
}
