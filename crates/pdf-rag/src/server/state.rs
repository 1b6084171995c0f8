//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::pipeline::{PipelineSettings, RagPipeline};
use crate::providers::{
    LlmProvider, OllamaGenerator, OnnxEmbedder, QdrantStore, VectorStoreProvider,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    pipeline: RagPipeline,
}

impl AppState {
    /// Wrap an already wired pipeline
    pub fn new(config: RagConfig, pipeline: RagPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        }
    }

    /// Connect the ONNX embedder, Qdrant and Ollama described by `config`
    pub async fn connect(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let embedder = Arc::new(OnnxEmbedder::new(&config.embeddings).await?);
        tracing::info!("Embedder ready: {}", embedder.model_name());

        let store = Arc::new(QdrantStore::new(&config.vector_db)?);
        if !store.health_check().await? {
            tracing::warn!(
                "Qdrant at {} is not reachable yet; requests will fail until it is",
                config.vector_db.url
            );
        }

        let generator = Arc::new(OllamaGenerator::new(&config.llm)?);
        tracing::info!(
            "Generator: {} at {}",
            config.llm.generate_model,
            config.llm.base_url
        );
        if !generator.health_check().await? {
            tracing::warn!(
                "Ollama not available at {}; answers will fail until it is",
                config.llm.base_url
            );
        }

        let pipeline = RagPipeline::new(
            embedder,
            store,
            generator,
            PipelineSettings::from_config(&config),
        )?;

        Ok(Self::new(config, pipeline))
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    /// Collection all requests go to
    pub fn collection(&self) -> &str {
        &self.inner.config.vector_db.collection
    }

    /// Ready when both the vector store and the generator answer
    pub async fn is_ready(&self) -> bool {
        let pipeline = &self.inner.pipeline;
        let (store, generator) = tokio::join!(
            pipeline.store().health_check(),
            pipeline.generator().health_check()
        );

        let store = store.unwrap_or(false);
        let generator = generator.unwrap_or(false);
        if !generator {
            tracing::warn!("Generator {} is not available", pipeline.generator().name());
        }
        store && generator
    }
}
