//! Process-local vector store using cosine similarity
//!
//! Holds every collection in memory behind a `parking_lot::RwLock`. Enforces
//! the same dimensionality rules as Qdrant so pipeline behaviour can be
//! exercised without a running database.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::Point;

use super::vector_store::{ScoredPoint, VectorStoreProvider};

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    points: Vec<Point>,
}

/// In-memory vector store
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_dimensions(collection: &str, expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            return Err(Error::DimensionMismatch {
                collection: collection.to_string(),
                collection_dim: expected,
                embedder_dim: actual,
            });
        }
        Ok(())
    }
}

/// Cosine similarity, 0.0 when either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn collection_dimensions(&self, collection: &str) -> Result<Option<usize>> {
        Ok(self.collections.read().get(collection).map(|c| c.dimensions))
    }

    async fn create_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(collection) {
            return Err(Error::vector_db(format!(
                "collection '{}' already exists",
                collection
            )));
        }
        collections.insert(
            collection.to_string(),
            Collection {
                dimensions,
                points: Vec::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()> {
        let mut collections = self.collections.write();
        let store = collections.get_mut(collection).ok_or_else(|| {
            Error::vector_db(format!("collection '{}' does not exist", collection))
        })?;

        for point in points {
            Self::check_dimensions(collection, store.dimensions, point.dimensions())?;
        }

        for point in points {
            match store.points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point.clone(),
                None => store.points.push(point.clone()),
            }
        }

        tracing::debug!(collection, count = points.len(), "upserted points in memory");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read();
        let Some(store) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Self::check_dimensions(collection, store.dimensions, vector.len())?;

        let mut scored: Vec<ScoredPoint> = store
            .points
            .iter()
            .map(|point| ScoredPoint {
                id: point.id.to_string(),
                score: cosine_similarity(&point.vector, vector),
                payload: point.payload.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
