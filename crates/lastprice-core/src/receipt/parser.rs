//! Heuristic receipt parser working line by line on OCR text.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::ids::{Clock, IdGenerator, SystemClock, TimestampIds};
use crate::models::receipt::{sanitize_price, ReceiptData, ReceiptItem};

use super::patterns::{is_total_line, DATE_SLASHED, PRICE};
use super::{ExtractionResult, ReceiptParser};

/// Store name used when the text has no lines.
pub const UNKNOWN_STORE: &str = "Unknown Store";

/// Item names this short (in characters) are treated as noise.
const MIN_NAME_LEN: usize = 3;

/// Rule-based parser: first line is the store, the first slashed date is the
/// date, the first `TOTAL` line with an amount is the total, and every other
/// line with an amount is an item.
pub struct HeuristicReceiptParser {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    unknown_store_label: String,
}

impl HeuristicReceiptParser {
    /// Create a parser using the wall clock and timestamp ids.
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            ids: Arc::new(TimestampIds::new()),
            unknown_store_label: UNKNOWN_STORE.to_string(),
        }
    }

    /// Set the clock used for timestamps and the date fallback.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the generator for receipt and item ids.
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Set the store name used for empty text.
    pub fn with_unknown_store_label(mut self, label: impl Into<String>) -> Self {
        self.unknown_store_label = label.into();
        self
    }

    /// Parse text and report what had to be guessed.
    pub fn parse_with_report(&self, text: &str) -> ExtractionResult {
        let start = Instant::now();
        let mut warnings = Vec::new();
        let id = self.ids.next_id();

        let lines = split_lines(text);
        info!("Parsing receipt from {} non-blank lines", lines.len());

        let store = match lines.first() {
            Some(line) => line.to_string(),
            None => {
                warnings.push("No text lines found, store is unknown".to_string());
                self.unknown_store_label.clone()
            }
        };

        let date = match extract_date(&lines) {
            Some(date) => date,
            None => {
                let today = self.clock.local_short_date();
                warnings.push(format!("No date found, using today ({})", today));
                today
            }
        };

        let total = extract_total(&lines);
        if total.is_none() {
            warnings.push("No total line found".to_string());
        }

        let (items, discarded) = self.extract_items(&lines);
        if discarded > 0 {
            debug!("Discarded {} priced lines with too short a name", discarded);
        }
        for warning in &warnings {
            debug!("{}", warning);
        }

        let receipt = ReceiptData {
            id,
            store,
            date,
            total,
            items,
            timestamp: self.clock.now(),
        };

        debug!(
            "Parsed receipt from {:?}: {} items, total {:?}",
            receipt.store,
            receipt.items.len(),
            receipt.total
        );

        ExtractionResult {
            receipt,
            raw_text: text.to_string(),
            warnings,
            discarded_lines: discarded,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn extract_items(&self, lines: &[&str]) -> (Vec<ReceiptItem>, usize) {
        let mut items = Vec::new();
        let mut discarded = 0;

        for line in lines.iter().filter(|line| !is_total_line(line)) {
            let Some(m) = PRICE.find(line) else {
                continue;
            };

            let name = format!("{}{}", &line[..m.start()], &line[m.end()..]);
            let name = name.trim();

            if name.chars().count() < MIN_NAME_LEN {
                discarded += 1;
                continue;
            }

            items.push(ReceiptItem::new(self.ids.next_id(), name, parse_amount(m.as_str())));
        }

        (items, discarded)
    }
}

impl Default for HeuristicReceiptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptParser for HeuristicReceiptParser {
    fn parse(&self, text: &str) -> ReceiptData {
        self.parse_with_report(text).receipt
    }
}

fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// The whole first line carrying a slashed date.
fn extract_date(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|line| DATE_SLASHED.is_match(line))
        .map(|line| line.to_string())
}

fn extract_total(lines: &[&str]) -> Option<Decimal> {
    lines
        .iter()
        .filter(|line| is_total_line(line))
        .find_map(|line| PRICE.find(line))
        .map(|m| parse_amount(m.as_str()))
}

/// Amounts too large for a decimal fall back to zero.
fn parse_amount(s: &str) -> Decimal {
    Decimal::from_str(s).map(sanitize_price).unwrap_or(Decimal::ZERO)
}
