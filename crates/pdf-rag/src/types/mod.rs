//! Core types for the RAG service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkPayload, Point};
pub use query::AskForm;
pub use response::{Answer, IngestReport, UploadResponse};
