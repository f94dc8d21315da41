//! Regex patterns for receipt line classification.

use lazy_static::lazy_static;
use regex::Regex;

// Digit classes are ASCII only; `\d` would also match other scripts.
lazy_static! {
    // 1/2/24, 01/02/2024
    pub static ref DATE_SLASHED: Regex = Regex::new(
        r"[0-9]{1,2}/[0-9]{1,2}/[0-9]{2,4}"
    ).unwrap();

    // Dot-decimal amount with exactly two fraction digits
    pub static ref PRICE: Regex = Regex::new(
        r"[0-9]+\.[0-9]{2}"
    ).unwrap();
}

/// Marker identifying total lines (compared case-insensitively).
pub const TOTAL_MARKER: &str = "TOTAL";

/// Whether a line mentions the total marker in any letter case.
pub fn is_total_line(line: &str) -> bool {
    line.to_uppercase().contains(TOTAL_MARKER)
}
