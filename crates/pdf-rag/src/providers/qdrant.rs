//! Qdrant vector store backend over gRPC

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, vectors_config, CountPointsBuilder, CreateCollectionBuilder,
    Distance, PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::{ChunkPayload, Point};

use super::vector_store::{ScoredPoint, VectorStoreProvider};

/// gRPC status codes that mean the server could not be reached in time
const GRPC_DEADLINE_EXCEEDED: i32 = 4;
const GRPC_UNAVAILABLE: i32 = 14;

/// Vector store backed by a Qdrant server
pub struct QdrantStore {
    client: Qdrant,
    url: String,
}

impl QdrantStore {
    /// Connect using the vector database settings
    ///
    /// The client connects lazily; an unreachable server surfaces on the
    /// first request as `UpstreamUnavailable`.
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Qdrant::from_url(&config.url)
            .timeout(timeout)
            .connect_timeout(timeout)
            .api_key(config.api_key.clone())
            .build()
            .map_err(|e| Error::Config(format!("Invalid Qdrant settings: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Wrap an existing client
    pub fn from_client(client: Qdrant, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    fn map_err(&self, e: QdrantError) -> Error {
        match &e {
            QdrantError::ResponseError { status } => {
                let code = status.code() as i32;
                if code == GRPC_UNAVAILABLE || code == GRPC_DEADLINE_EXCEEDED {
                    Error::unavailable(format!("Qdrant at {}: {}", self.url, status.message()))
                } else {
                    Error::vector_db(e.to_string())
                }
            }
            _ => Error::vector_db(e.to_string()),
        }
    }

    fn to_point_struct(point: &Point) -> Result<PointStruct> {
        let payload = Payload::try_from(serde_json::to_value(&point.payload)?)
            .map_err(|e| Error::vector_db(format!("Invalid payload: {}", e)))?;
        Ok(PointStruct::new(
            point.id.to_string(),
            point.vector.clone(),
            payload,
        ))
    }

    fn point_id_string(id: Option<&PointId>) -> String {
        match id.and_then(|pid| pid.point_id_options.as_ref()) {
            Some(PointIdOptions::Uuid(s)) => s.clone(),
            Some(PointIdOptions::Num(n)) => n.to_string(),
            None => String::new(),
        }
    }

    fn payload_from(map: &HashMap<String, QdrantValue>) -> ChunkPayload {
        let string = |key: &str| match map.get(key).and_then(|v| v.kind.as_ref()) {
            Some(Kind::StringValue(s)) => s.clone(),
            _ => String::new(),
        };
        let page = match map.get("page").and_then(|v| v.kind.as_ref()) {
            Some(Kind::IntegerValue(n)) => *n as u32,
            Some(Kind::DoubleValue(n)) => *n as u32,
            _ => 0,
        };

        ChunkPayload {
            text: string("text"),
            page,
            document: string("document"),
        }
    }
}

#[async_trait]
impl VectorStoreProvider for QdrantStore {
    async fn collection_dimensions(&self, collection: &str) -> Result<Option<usize>> {
        let exists = self
            .client
            .collection_exists(collection)
            .await
            .map_err(|e| self.map_err(e))?;
        if !exists {
            return Ok(None);
        }

        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(|e| self.map_err(e))?;

        let config = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config);

        match config {
            Some(vectors_config::Config::Params(params)) => Ok(Some(params.size as usize)),
            Some(vectors_config::Config::ParamsMap(_)) => Err(Error::vector_db(format!(
                "collection '{}' uses named vectors, expected a single unnamed vector",
                collection
            ))),
            None => Err(Error::vector_db(format!(
                "collection '{}' reported no vector configuration",
                collection
            ))),
        }
    }

    async fn create_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| self.map_err(e))?;

        tracing::debug!(collection, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let structs = points
            .iter()
            .map(Self::to_point_struct)
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, structs).wait(true))
            .await
            .map_err(|e| self.map_err(e))?;

        tracing::debug!(collection, count = points.len(), "upserted points to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let exists = self
            .client
            .collection_exists(collection)
            .await
            .map_err(|e| self.map_err(e))?;
        if !exists {
            tracing::warn!("Collection '{}' does not exist, nothing to search", collection);
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, vector.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| self.map_err(e))?;

        Ok(response
            .result
            .into_iter()
            .map(|scored| ScoredPoint {
                id: Self::point_id_string(scored.id.as_ref()),
                score: scored.score,
                payload: Self::payload_from(&scored.payload),
            })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        if self.collection_dimensions(collection).await?.is_none() {
            return Ok(0);
        }

        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(|e| self.map_err(e))?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.health_check().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Qdrant health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_payload_roundtrip_through_qdrant_values() {
        let payload = ChunkPayload {
            text: "guide: reset the router".to_string(),
            page: 7,
            document: "guide".to_string(),
        };
        let mut map: HashMap<String, QdrantValue> = HashMap::new();
        map.insert("text".to_string(), QdrantValue::from(payload.text.clone()));
        map.insert("page".to_string(), QdrantValue::from(7i64));
        map.insert("document".to_string(), QdrantValue::from(payload.document.clone()));

        assert_eq!(QdrantStore::payload_from(&map), payload);
    }

    #[test]
    fn test_point_id_string() {
        let id = Uuid::new_v4().to_string();
        let pid: PointId = id.clone().into();
        assert_eq!(QdrantStore::point_id_string(Some(&pid)), id);
        let pid: PointId = 42u64.into();
        assert_eq!(QdrantStore::point_id_string(Some(&pid)), "42");
        assert_eq!(QdrantStore::point_id_string(None), "");
    }
}
