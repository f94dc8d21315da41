//! OCR text cleanup and prompt formatting.

mod preprocess;
mod prompt;

pub use preprocess::{preprocess, preprocess_with, PreprocessPolicy};
pub use prompt::{format_for_llm, format_for_llm_with, PROMPT_HEADER};
