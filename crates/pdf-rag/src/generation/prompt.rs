//! Prompt templates for RAG generation

/// Phrase the generator is told to emit when the context has no answer
pub const FALLBACK_ANSWER: &str = "Not found in the provided context.";

/// Separator between retrieved chunks in the context block
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts, highest ranked first
    pub fn build_context<S: AsRef<str>>(chunks: &[S]) -> String {
        chunks
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Build the full RAG prompt
    pub fn build_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Answer the following question **only** in English and **only** using the information from the provided context. Do not make up any information. If the answer is not in the context, reply "{fallback}"
Question: {question}
Context:
{context}
Answer in English:"#,
            fallback = FALLBACK_ANSWER,
            question = question.trim(),
            context = context
        )
    }
}
