//! Prompt construction for answer generation

pub mod prompt;

pub use prompt::{PromptBuilder, FALLBACK_ANSWER};
