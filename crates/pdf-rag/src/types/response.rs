//! Response types

use serde::{Deserialize, Serialize};

/// Answer to a question, with the chunks it was generated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// The question as asked
    pub question: String,
    /// Retrieved chunk texts, most similar first
    #[serde(default)]
    pub chunks: Vec<String>,
    /// Generated answer, trimmed
    pub answer: String,
}

impl Answer {
    /// Chunks joined the way they were shown to the generator
    pub fn context(&self) -> String {
        self.chunks.join("\n\n")
    }
}

/// Outcome of ingesting one PDF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Document name derived from the file name
    pub document: String,
    /// Pages read from the file
    pub pages: usize,
    /// Points written to the collection
    pub chunks: usize,
}

/// Body of a successful `POST /upload_pdf`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
}

impl From<IngestReport> for UploadResponse {
    fn from(report: IngestReport) -> Self {
        Self {
            status: "ok".to_string(),
            document: Some(report.document),
            chunks: Some(report.chunks),
        }
    }
}
