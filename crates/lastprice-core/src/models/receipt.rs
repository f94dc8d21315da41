//! Receipt data model and in-memory editing operations.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::IdGenerator;

/// Name given to items added by hand.
pub const NEW_ITEM_NAME: &str = "New Item";

/// A single purchased product on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    /// Identifier, unique within its receipt.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,

    /// Product name as printed (or as edited).
    pub name: String,

    /// Price, never negative.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl ReceiptItem {
    pub fn new(id: u64, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            price: sanitize_price(price),
        }
    }
}

/// One shopping transaction: store, date, items, and total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptData {
    /// Identifier, unique across saved receipts.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,

    /// Store name; may be empty when unknown.
    pub store: String,

    /// Free-form date text.
    pub date: String,

    /// Detected (or derived) total, if any.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total: Option<Decimal>,

    /// Line items in detection/insertion order.
    #[serde(deserialize_with = "deserialize_items")]
    pub items: Vec<ReceiptItem>,

    /// Creation instant.
    pub timestamp: DateTime<Utc>,
}

impl ReceiptData {
    /// Sum of all item prices.
    ///
    /// This is independent from [`ReceiptData::total`]; both are shown and
    /// no reconciliation is attempted.
    pub fn calculated_total(&self) -> Decimal {
        self.items.iter().map(|item| item.price).sum()
    }

    pub fn set_store(&mut self, store: impl Into<String>) {
        self.store = store.into();
    }

    pub fn set_date(&mut self, date: impl Into<String>) {
        self.date = date.into();
    }

    /// Append a blank item and return its id.
    pub fn add_item(&mut self, ids: &dyn IdGenerator) -> u64 {
        let mut id = ids.next_id();
        while self.items.iter().any(|item| item.id == id) {
            id = ids.next_id();
        }
        self.items.push(ReceiptItem::new(id, NEW_ITEM_NAME, Decimal::ZERO));
        id
    }

    /// Rename an item. Returns `false` when no item has this id.
    pub fn rename_item(&mut self, id: u64, name: impl Into<String>) -> bool {
        match self.item_mut(id) {
            Some(item) => {
                item.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Set an item's price from user text; anything unparseable becomes 0.
    pub fn reprice_item(&mut self, id: u64, text: &str) -> bool {
        match self.item_mut(id) {
            Some(item) => {
                item.price = parse_price(text);
                true
            }
            None => false,
        }
    }

    /// Remove an item. Returns `false` when no item has this id.
    pub fn remove_item(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    fn item_mut(&mut self, id: u64) -> Option<&mut ReceiptItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

/// Parse a price typed by the user or read from text.
///
/// Leading numeric text is accepted (`"3.50 EUR"` is 3.50); empty,
/// non-numeric and negative input yields 0.
pub fn parse_price(text: &str) -> Decimal {
    let text = text.trim();
    let numeric: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut candidate = numeric.as_str();
    // "12." or "1.2.3" should still yield the longest valid prefix
    while !candidate.is_empty() {
        if let Ok(value) = Decimal::from_str(candidate) {
            return sanitize_price(value);
        }
        candidate = &candidate[..candidate.len() - 1];
    }

    Decimal::ZERO
}

/// Clamp a price to the non-negative range.
pub fn sanitize_price(price: Decimal) -> Decimal {
    if price.is_sign_negative() {
        Decimal::ZERO
    } else {
        price
    }
}

/// Read an id written as any non-negative JSON number.
///
/// Older collections hold fractional ids (a millisecond timestamp plus a
/// random fraction); those are truncated to whole numbers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    id_from_number(&number).ok_or_else(|| D::Error::custom(format!("invalid id: {}", number)))
}

fn id_from_number(number: &serde_json::Number) -> Option<u64> {
    if let Some(id) = number.as_u64() {
        return Some(id);
    }
    let value = number.as_f64()?;
    if value.is_finite() && value >= 0.0 && value < u64::MAX as f64 {
        Some(value.trunc() as u64)
    } else {
        None
    }
}

/// Read items, moving any id that truncation made ambiguous to a free one.
fn deserialize_items<'de, D>(deserializer: D) -> Result<Vec<ReceiptItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut items = Vec::<ReceiptItem>::deserialize(deserializer)?;

    let mut seen = HashSet::with_capacity(items.len());
    let mut next = items
        .iter()
        .map(|item| item.id)
        .max()
        .unwrap_or(0)
        .wrapping_add(1);
    for item in &mut items {
        if seen.insert(item.id) {
            continue;
        }
        while seen.contains(&next) {
            next = next.wrapping_add(1);
        }
        item.id = next;
        seen.insert(next);
    }

    Ok(items)
}

/// Format an amount with two decimals.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample() -> ReceiptData {
        ReceiptData {
            id: 1,
            store: "Store A".to_string(),
            date: "01/02/2024".to_string(),
            total: Some(Decimal::new(570, 2)),
            items: vec![
                ReceiptItem::new(10, "Milk", Decimal::new(350, 2)),
                ReceiptItem::new(11, "Bread", Decimal::new(220, 2)),
            ],
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_calculated_total() {
        let receipt = sample();
        assert_eq!(receipt.calculated_total(), Decimal::new(570, 2));
    }

    #[test]
    fn test_add_rename_reprice_remove() {
        let mut receipt = sample();
        let ids = SequentialIds::starting_at(10);

        // 10 and 11 are taken, so the new item gets 12
        let id = receipt.add_item(&ids);
        assert_eq!(id, 12);
        assert_eq!(receipt.items.last().unwrap().name, NEW_ITEM_NAME);
        assert_eq!(receipt.items.last().unwrap().price, Decimal::ZERO);

        assert!(receipt.rename_item(id, "Eggs"));
        assert!(receipt.reprice_item(id, "4.25"));
        assert_eq!(receipt.items[2], ReceiptItem::new(12, "Eggs", Decimal::new(425, 2)));
        assert_eq!(receipt.calculated_total(), Decimal::new(995, 2));

        assert!(receipt.remove_item(10));
        assert!(!receipt.remove_item(10));
        assert_eq!(receipt.items.len(), 2);
        // detected total is left alone
        assert_eq!(receipt.total, Some(Decimal::new(570, 2)));
    }

    #[test]
    fn test_edits_on_missing_item() {
        let mut receipt = sample();
        assert!(!receipt.rename_item(99, "x"));
        assert!(!receipt.reprice_item(99, "1.00"));
        assert_eq!(receipt, sample());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("3.50"), Decimal::new(350, 2));
        assert_eq!(parse_price(" 7 "), Decimal::from(7));
        assert_eq!(parse_price("3.50 EUR"), Decimal::new(350, 2));
        assert_eq!(parse_price("12."), Decimal::from(12));
        assert_eq!(parse_price("1.2.3"), Decimal::new(12, 1));
        assert_eq!(parse_price(""), Decimal::ZERO);
        assert_eq!(parse_price("abc"), Decimal::ZERO);
        assert_eq!(parse_price("-4"), Decimal::ZERO);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["total"], serde_json::json!(5.7));
        assert_eq!(json["items"][0]["price"], serde_json::json!(3.5));
        assert_eq!(json["items"][1]["name"], "Bread");
        assert!(json["timestamp"].as_str().unwrap().starts_with("2024-01-02T10:00:00"));

        let back: ReceiptData = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_missing_total_serializes_as_null() {
        let mut receipt = sample();
        receipt.total = None;

        let json = serde_json::to_value(&receipt).unwrap();
        assert!(json["total"].is_null());
    }

    #[test]
    fn test_fractional_ids_are_truncated() {
        let receipt: ReceiptData = serde_json::from_str(
            r#"{"id":1717000000000.5,"store":"Shop","date":"5/29/2024","total":3.5,
                "items":[{"id":1717000000001.4273,"name":"Tea","price":1.2},
                         {"id":1717000000002.0071,"name":"Jam","price":2.3}],
                "timestamp":"2024-05-29T16:26:40.000Z"}"#,
        )
        .unwrap();

        assert_eq!(receipt.id, 1717000000000);
        assert_eq!(receipt.items[0].id, 1717000000001);
        assert_eq!(receipt.items[1].id, 1717000000002);

        // whole numbers are written back
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["items"][0]["id"].as_u64(), Some(1717000000001));
    }

    #[test]
    fn test_ids_colliding_after_truncation_are_moved() {
        let receipt: ReceiptData = serde_json::from_str(
            r#"{"id":1,"store":"Shop","date":"","total":null,
                "items":[{"id":1717000000001.25,"name":"Tea","price":1.2},
                         {"id":1717000000001.75,"name":"Jam","price":2.3}],
                "timestamp":"2024-05-29T16:26:40.000Z"}"#,
        )
        .unwrap();

        assert_eq!(receipt.items[0].id, 1717000000001);
        assert_eq!(receipt.items[1].id, 1717000000002);
    }

    #[test]
    fn test_invalid_ids_are_rejected() {
        for id in ["-3", "\"7\"", "null"] {
            let json = format!(r#"{{"id":{},"name":"Tea","price":1.2}}"#, id);
            assert!(serde_json::from_str::<ReceiptItem>(&json).is_err(), "{}", id);
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(57, 1)), "5.70");
        assert_eq!(format_amount(Decimal::from(4)), "4.00");
    }
}
