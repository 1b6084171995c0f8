//! Vector store provider trait for storing and searching points

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{ChunkPayload, Point};

/// Search hit from the vector store
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    /// Point id
    pub id: String,
    /// Cosine similarity, higher is more similar
    pub score: f32,
    /// Stored payload
    pub payload: ChunkPayload,
}

/// Trait for collection management, upserts and similarity search
///
/// Implementations:
/// - `QdrantStore`: Qdrant over gRPC
/// - `InMemoryVectorStore`: process-local store for tests and demos
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Vector size of a collection, `None` when it does not exist
    async fn collection_dimensions(&self, collection: &str) -> Result<Option<usize>>;

    /// Create a collection with cosine distance
    async fn create_collection(&self, collection: &str, dimensions: usize) -> Result<()>;

    /// Insert or replace points by id
    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()>;

    /// The `top_k` most similar points, most similar first
    ///
    /// A missing collection yields no results.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>>;

    /// Number of points in a collection (0 when it does not exist)
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Create the collection if needed and check its dimensionality
    ///
    /// Returns `true` when the collection was created by this call.
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<bool> {
        match self.collection_dimensions(collection).await? {
            Some(existing) if existing == dimensions => Ok(false),
            Some(existing) => Err(Error::DimensionMismatch {
                collection: collection.to_string(),
                collection_dim: existing,
                embedder_dim: dimensions,
            }),
            None => {
                self.create_collection(collection, dimensions).await?;
                tracing::info!(
                    "Created collection '{}' ({} dims, cosine) in {}",
                    collection,
                    dimensions,
                    self.name()
                );
                Ok(true)
            }
        }
    }
}
