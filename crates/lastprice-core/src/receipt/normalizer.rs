//! Normalization of remote language-model responses into receipts.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::ExtractionError;
use crate::ids::{Clock, IdGenerator, SystemClock, TimestampIds};
use crate::models::receipt::{sanitize_price, ReceiptData, ReceiptItem};

use super::Result;

/// Converts `[{ "name": ..., "price": ... }, ...]` responses into receipts.
///
/// Store and date cannot be recovered from this shape and are left empty;
/// the total is always the sum of item prices.
pub struct LlmResponseNormalizer {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl LlmResponseNormalizer {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            ids: Arc::new(TimestampIds::new()),
        }
    }

    /// Set the clock used for timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the generator for receipt ids.
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Normalize a decoded JSON response.
    pub fn normalize(&self, response: &Value) -> Result<ReceiptData> {
        let Value::Array(entries) = response else {
            let raw = response
                .get("raw")
                .map(|raw| match raw {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
            error!(
                "Remote extraction returned {} instead of an item array (raw: {:?})",
                json_type(response),
                raw
            );
            return Err(ExtractionError::UnexpectedShape {
                found: json_type(response),
                raw,
            });
        };

        let empty = Map::new();
        let items: Vec<ReceiptItem> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let fields = entry.as_object().unwrap_or(&empty);
                ReceiptItem::new(
                    index as u64 + 1,
                    item_name(fields.get("name")),
                    item_price(fields.get("price")),
                )
            })
            .collect();

        let total: Decimal = items.iter().map(|item| item.price).sum();
        debug!("Normalized {} items, total {}", items.len(), total);

        Ok(ReceiptData {
            id: self.ids.next_id(),
            store: String::new(),
            date: String::new(),
            total: Some(total),
            items,
            timestamp: self.clock.now(),
        })
    }

    /// Decode a response body and normalize it.
    pub fn normalize_str(&self, body: &str) -> Result<ReceiptData> {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => self.normalize(&value),
            Err(e) => {
                error!("Remote extraction returned invalid JSON: {}", e);
                Err(ExtractionError::UnexpectedShape {
                    found: "invalid JSON",
                    raw: Some(body.to_string()),
                })
            }
        }
    }
}

impl Default for LlmResponseNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Only strings count as names.
fn item_name(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(name)) => name.clone(),
        _ => String::new(),
    }
}

/// Only JSON numbers count as prices; numeric strings are not coerced.
fn item_price(value: Option<&Value>) -> Decimal {
    let Some(Value::Number(number)) = value else {
        return Decimal::ZERO;
    };

    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(sanitize_price)
        .unwrap_or(Decimal::ZERO)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
