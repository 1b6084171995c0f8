//! Ingestion and question answering over a vector collection

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{PromptBuilder, FALLBACK_ANSWER};
use crate::ingestion::{document_name, PageText, PdfParser, WordChunker};
use crate::providers::{EmbeddingProvider, LlmProvider, VectorStoreProvider};
use crate::types::{Answer, Chunk, IngestReport, Point};

/// Tunables for ingestion and generation
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Words per chunk
    pub chunk_size: usize,
    /// Words shared by consecutive chunks
    pub overlap: usize,
    /// Upper bound on generated answer tokens
    pub max_tokens: usize,
    /// Use content-derived point ids
    pub dedup_chunks: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            chunk_size: config.chunking.chunk_size,
            overlap: config.chunking.overlap,
            max_tokens: config.llm.max_tokens,
            dedup_chunks: config.chunking.dedup_chunks,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

/// Dense retrieval pipeline: PDF ingestion plus grounded answer generation
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    generator: Arc<dyn LlmProvider>,
    chunker: WordChunker,
    settings: PipelineSettings,
}

impl RagPipeline {
    /// Wire a pipeline from its collaborators
    ///
    /// Fails with `InvalidConfiguration` when the chunk settings cannot make
    /// progress.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        generator: Arc<dyn LlmProvider>,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let chunker = WordChunker::new(settings.chunk_size, settings.overlap)?;
        Ok(Self {
            embedder,
            store,
            generator,
            chunker,
            settings,
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.store
    }

    pub fn generator(&self) -> &Arc<dyn LlmProvider> {
        &self.generator
    }

    /// Create the collection if needed, sized for the embedder
    pub async fn ensure_collection(&self, collection: &str) -> Result<()> {
        self.store
            .ensure_collection(collection, self.embedder.dimensions())
            .await?;
        Ok(())
    }

    /// Extract, chunk, embed and store a PDF file
    pub async fn add_pdf(&self, path: &Path, collection: &str) -> Result<IngestReport> {
        let document = document_name(path);
        self.ensure_collection(collection).await?;

        let owned = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || PdfParser::extract_pages(&owned))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))??;

        let report = self.ingest_pages(&document, &pages, collection).await?;

        tracing::info!(
            "Loaded {} chunks from {} into collection {}",
            report.chunks,
            path.display(),
            collection
        );

        Ok(report)
    }

    /// Chunk, embed and store already extracted pages
    pub async fn ingest_pages(
        &self,
        document: &str,
        pages: &[PageText],
        collection: &str,
    ) -> Result<IngestReport> {
        self.ensure_collection(collection).await?;

        let chunks = self.chunker.chunk_pages(document, pages);
        let report = IngestReport {
            document: document.to_string(),
            pages: pages.len(),
            chunks: chunks.len(),
        };

        if chunks.is_empty() {
            tracing::warn!("No chunks produced for '{}'", document);
            return Ok(report);
        }

        let start = Instant::now();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let points: Vec<Point> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| self.point_for(chunk, vector))
            .collect();

        self.store.upsert(collection, &points).await?;

        tracing::debug!(
            document,
            chunks = points.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upserted chunks"
        );

        Ok(report)
    }

    fn point_for(&self, chunk: Chunk, vector: Vec<f32>) -> Point {
        if self.settings.dedup_chunks {
            Point::with_content_id(chunk, vector)
        } else {
            Point::new(chunk, vector)
        }
    }

    /// Answer a question from the `top_k` most similar chunks
    pub async fn generate_answer(
        &self,
        query: &str,
        collection: &str,
        top_k: usize,
    ) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(Error::invalid_input("Query must not be empty"));
        }
        if top_k == 0 {
            return Err(Error::invalid_input("top_k must be at least 1"));
        }

        let start = Instant::now();
        let vector = self.embedder.embed(query).await?;
        let hits = self.store.search(collection, &vector, top_k).await?;
        let chunks: Vec<String> = hits.into_iter().map(|hit| hit.payload.text).collect();

        if chunks.is_empty() {
            tracing::info!("No context found for query in '{}'", collection);
            return Ok(Answer {
                question: query.to_string(),
                chunks,
                answer: FALLBACK_ANSWER.to_string(),
            });
        }

        let context = PromptBuilder::build_context(&chunks);
        let prompt = PromptBuilder::build_prompt(query, &context);
        let generated = self
            .generator
            .generate(&prompt, self.settings.max_tokens)
            .await?;

        tracing::info!(
            "Answered query with {} chunks via {} in {:?}",
            chunks.len(),
            self.generator.name(),
            start.elapsed()
        );

        Ok(Answer {
            question: query.to_string(),
            chunks,
            answer: generated.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::InMemoryVectorStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Embeds text as letter frequencies
    struct LetterEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                        v[(c - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            26
        }

        fn name(&self) -> &str {
            "letters"
        }
    }

    /// Records prompts and answers with padded text
    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingGenerator {
        async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
            self.prompts.lock().push((prompt.to_string(), max_tokens));
            Ok("  a widget \n".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    fn pipeline(settings: PipelineSettings) -> (RagPipeline, Arc<RecordingGenerator>) {
        let generator = Arc::new(RecordingGenerator::default());
        let pipeline = RagPipeline::new(
            Arc::new(LetterEmbedder),
            Arc::new(InMemoryVectorStore::new()),
            generator.clone(),
            settings,
        )
        .unwrap();
        (pipeline, generator)
    }

    fn page(number: u32, words: usize) -> PageText {
        let text = (0..words)
            .map(|i| format!("widgetry{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        PageText::new(number, text)
    }

    #[tokio::test]
    async fn test_ingest_and_answer() {
        let (pipeline, generator) = pipeline(PipelineSettings::default());
        let report = pipeline
            .ingest_pages("manual", &[page(1, 30), page(2, 30)], "docs")
            .await
            .unwrap();
        assert_eq!(report.chunks, 2);
        assert_eq!(pipeline.store().count("docs").await.unwrap(), 2);

        let answer = pipeline
            .generate_answer("What is a widget?", "docs", 2)
            .await
            .unwrap();
        assert_eq!(answer.answer, "a widget");
        assert_eq!(answer.chunks.len(), 2);

        let prompts = generator.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, 256);
        assert!(prompts[0].0.contains(&answer.chunks.join("\n\n")));
    }

    #[tokio::test]
    async fn test_empty_collection_returns_fallback() {
        let (pipeline, generator) = pipeline(PipelineSettings::default());
        pipeline.ensure_collection("empty").await.unwrap();

        let answer = pipeline.generate_answer("What is X?", "empty", 2).await.unwrap();
        assert!(answer.chunks.is_empty());
        assert_eq!(answer.answer, FALLBACK_ANSWER);
        assert!(generator.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_empty_query_and_zero_top_k() {
        let (pipeline, _) = pipeline(PipelineSettings::default());
        assert!(matches!(
            pipeline.generate_answer("   ", "docs", 2).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            pipeline.generate_answer("What?", "docs", 0).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_dedup_overwrites_on_reingest() {
        let settings = PipelineSettings {
            dedup_chunks: true,
            ..PipelineSettings::default()
        };
        let (pipeline, _) = pipeline(settings);
        let pages = [page(1, 40)];
        pipeline.ingest_pages("manual", &pages, "docs").await.unwrap();
        pipeline.ingest_pages("manual", &pages, "docs").await.unwrap();
        assert_eq!(pipeline.store().count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let (pipeline, _) = pipeline(PipelineSettings::default());
        pipeline.store().create_collection("docs", 384).await.unwrap();
        let err = pipeline.ensure_collection("docs").await.unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                collection_dim: 384,
                embedder_dim: 26,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_chunk_settings() {
        let settings = PipelineSettings {
            chunk_size: 50,
            overlap: 50,
            ..PipelineSettings::default()
        };
        let result = RagPipeline::new(
            Arc::new(LetterEmbedder),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(RecordingGenerator::default()),
            settings,
        );
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }
}
