//! Chunks and the vector-store points built from them

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded slice of a document's text, tagged with its source page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Rendered text, `"<document>: <words>"`
    pub text: String,
    /// Page number (1-indexed)
    pub page: u32,
    /// Document name (file stem)
    pub document: String,
}

impl Chunk {
    /// Stable id for this chunk, used when re-ingestion should overwrite
    pub fn content_id(&self) -> Uuid {
        let key = format!("{}\u{0}{}\u{0}{}", self.document, self.page, self.text);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }
}

/// Payload stored next to each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub page: u32,
    pub document: String,
}

impl From<Chunk> for ChunkPayload {
    fn from(chunk: Chunk) -> Self {
        Self {
            text: chunk.text,
            page: chunk.page,
            document: chunk.document,
        }
    }
}

/// A vector-store record: embedding plus payload under a unique id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl Point {
    /// Build a point with a fresh random id
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            payload: chunk.into(),
        }
    }

    /// Build a point whose id is derived from the chunk content
    pub fn with_content_id(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.content_id(),
            vector,
            payload: chunk.into(),
        }
    }

    /// Vector length
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}
