//! pdf-rag: question answering over PDF documents
//!
//! PDFs are split into overlapping word windows, embedded with a local ONNX
//! sentence-transformer and stored in Qdrant. Questions retrieve the closest
//! chunks and a local Ollama model answers strictly from them. The crate ships
//! an HTTP service, a Telegram front-end and a bulk point uploader.

pub mod bot;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod types;
pub mod upload;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{PipelineSettings, RagPipeline};
pub use types::{Answer, Chunk, ChunkPayload, IngestReport, Point};
