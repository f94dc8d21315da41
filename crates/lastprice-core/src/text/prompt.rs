//! Prompt formatting for remote extraction.

use super::preprocess::{preprocess_with, PreprocessPolicy};

/// Instruction placed before the receipt lines.
pub const PROMPT_HEADER: &str = "Extract items and prices from this receipt OCR output:";

/// Build the remote extraction prompt with the default policy.
pub fn format_for_llm(raw: &str) -> String {
    format_for_llm_with(raw, PreprocessPolicy::default())
}

/// Build the remote extraction prompt: cleaned text, one `- ` bullet per
/// non-empty line.
pub fn format_for_llm_with(raw: &str, policy: PreprocessPolicy) -> String {
    let lines = preprocess_with(raw, policy)
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| format!("- {}", line))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n{}", PROMPT_HEADER, lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_for_llm() {
        let prompt = format_for_llm("Store A!\n\nMilk 3,50\nBread 2.20");
        assert_eq!(
            prompt,
            "Extract items and prices from this receipt OCR output:\n- Store A\n- Milk 3.50\n- Bread 2.20"
        );
    }

    #[test]
    fn test_format_for_llm_empty_text() {
        assert_eq!(format_for_llm("***"), format!("{}\n", PROMPT_HEADER));
    }
}
