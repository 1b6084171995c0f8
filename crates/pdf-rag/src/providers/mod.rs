//! Provider abstractions for embeddings, answer generation and vector storage
//!
//! The pipeline only sees the traits; the binaries wire in ONNX, Ollama and
//! Qdrant, tests wire in the in-memory store and stubs.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod onnx;
pub mod qdrant;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::InMemoryVectorStore;
pub use ollama::OllamaGenerator;
pub use onnx::OnnxEmbedder;
pub use qdrant::QdrantStore;
pub use vector_store::{ScoredPoint, VectorStoreProvider};
