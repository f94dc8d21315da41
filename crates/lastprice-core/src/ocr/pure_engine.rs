//! Receipt OCR backed by `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{OcrResult, TextRecognizer};

/// Rows closer than this many pixels are read as one line.
const ROW_HEIGHT: f64 = 20.0;

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    keep_unknown_glyphs: bool,
}

impl PureOcrEngine {
    /// Create an engine from the model files named in `config`.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        Self::from_dir(&config.model_dir, config)
    }

    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path, config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&config.detection_model);
        let rec_path = model_dir.join(&config.recognition_model);
        let dict_path = model_dir.join(&config.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine,
            keep_unknown_glyphs: config.keep_unknown_glyphs,
        })
    }
}

impl TextRecognizer for PureOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        info!("Recognizing receipt image: {}x{}", width, height);

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        // (top, left, text)
        let mut regions: Vec<(f64, f64, String)> = results
            .iter()
            .map(|r| {
                let (left, top) = top_left(&r.bounding_box);
                let text = if self.keep_unknown_glyphs {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                (top, left, text)
            })
            .collect();

        // Reading order: rows top to bottom, then left to right
        regions.sort_by(|a, b| {
            let row_a = (a.0 / ROW_HEIGHT) as i64;
            let row_b = (b.0 / ROW_HEIGHT) as i64;
            row_a
                .cmp(&row_b)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        });

        let line_count = regions.len();
        let text = regions
            .into_iter()
            .map(|(_, _, text)| text)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        let processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "OCR complete: {} text regions in {}ms",
            line_count, processing_time_ms
        );

        Ok(OcrResult {
            text,
            line_count,
            processing_time_ms,
        })
    }
}

/// Smallest x and y over the polygon's exterior ring.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .fold((f64::INFINITY, f64::INFINITY), |(x, y), c| {
            (x.min(c.x), y.min(c.y))
        })
}
