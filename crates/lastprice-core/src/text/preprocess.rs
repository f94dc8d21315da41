//! OCR text cleanup.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Anything but ASCII letters, digits, '.', ',' and whitespace
    static ref DISALLOWED: Regex = Regex::new(r"[^a-zA-Z0-9.,\s]").unwrap();

    static ref COMMA_DECIMAL: Regex = Regex::new(r"([0-9]),([0-9])").unwrap();

    static ref SPACE_RUN: Regex = Regex::new(r"[ ]{2,}").unwrap();

    static ref SPLIT_DECIMAL: Regex = Regex::new(r"([0-9])\s+([0-9])").unwrap();

    static ref NEWLINE_RUN: Regex = Regex::new(r"\n{2,}").unwrap();
}

/// Which number-repair heuristics run during preprocessing.
///
/// Both heuristics are blunt: `merge_split_decimals` also glues together
/// neighbouring numbers that were never one amount, such as a quantity
/// column followed by a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessPolicy {
    /// `12,99` becomes `12.99`.
    pub comma_decimals: bool,
    /// `12 99` becomes `12.99`.
    pub merge_split_decimals: bool,
}

impl Default for PreprocessPolicy {
    fn default() -> Self {
        Self {
            comma_decimals: true,
            merge_split_decimals: true,
        }
    }
}

impl PreprocessPolicy {
    /// Policy with both number-repair heuristics disabled.
    pub fn conservative() -> Self {
        Self {
            comma_decimals: false,
            merge_split_decimals: false,
        }
    }
}

/// Clean raw OCR text with the default policy.
pub fn preprocess(raw: &str) -> String {
    preprocess_with(raw, PreprocessPolicy::default())
}

/// Clean raw OCR text.
///
/// The result is stable: running it again on its own output changes
/// nothing.
pub fn preprocess_with(raw: &str, policy: PreprocessPolicy) -> String {
    let mut text = DISALLOWED.replace_all(raw, "").into_owned();

    if policy.comma_decimals {
        text = replace_until_stable(&COMMA_DECIMAL, text);
    }

    text = SPACE_RUN.replace_all(&text, " ").into_owned();

    if policy.merge_split_decimals {
        text = replace_until_stable(&SPLIT_DECIMAL, text);
    }

    text = NEWLINE_RUN.replace_all(&text, "\n").into_owned();

    text.trim().to_string()
}

/// Apply a `$1.$2` rewrite until no match is left.
///
/// Matches cannot overlap within one pass, so `1,2,3` needs two passes to
/// become `1.2.3`.
fn replace_until_stable(pattern: &Regex, mut text: String) -> String {
    while pattern.is_match(&text) {
        text = pattern.replace_all(&text, "${1}.${2}").into_owned();
    }
    text
}
