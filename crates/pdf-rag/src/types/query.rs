//! Request types

use serde::{Deserialize, Serialize};

/// Form body of `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskForm {
    /// The question to answer
    pub query: String,
    /// Number of chunks to retrieve (server default when absent)
    #[serde(default)]
    pub top_k: Option<usize>,
}
