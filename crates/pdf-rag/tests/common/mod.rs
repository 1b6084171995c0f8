//! Shared stubs for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use pdf_rag::config::RagConfig;
use pdf_rag::error::{Error, Result};
use pdf_rag::providers::{
    EmbeddingProvider, InMemoryVectorStore, LlmProvider, ScoredPoint, VectorStoreProvider,
};
use pdf_rag::server::{build_router, state::AppState};
use pdf_rag::types::Point;
use pdf_rag::{PipelineSettings, RagPipeline};

pub const DIMS: usize = 64;
pub const STUB_ANSWER: &str = "The widget is blue.";

/// Bag-of-words embedder: each lowercase word hashes into one of `DIMS` buckets
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIMS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % DIMS as u64) as usize] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Generator returning a fixed answer wrapped in whitespace, recording prompts
pub struct StubGenerator {
    answer: String,
    fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            answer: format!("\n  {}  \n", STUB_ANSWER),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for StubGenerator {
    async fn generate(&self, prompt: &str, _max_tokens: usize) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.fail {
            return Err(Error::generation("model crashed"));
        }
        Ok(self.answer.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub"
    }
}

/// Store whose backend is never reachable
pub struct UnreachableStore;

#[async_trait]
impl VectorStoreProvider for UnreachableStore {
    async fn collection_dimensions(&self, _collection: &str) -> Result<Option<usize>> {
        Err(Error::unavailable("connection refused"))
    }

    async fn create_collection(&self, _collection: &str, _dimensions: usize) -> Result<()> {
        Err(Error::unavailable("connection refused"))
    }

    async fn upsert(&self, _collection: &str, _points: &[Point]) -> Result<()> {
        Err(Error::unavailable("connection refused"))
    }

    async fn search(
        &self,
        _collection: &str,
        _vector: &[f32],
        _top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        Err(Error::unavailable("connection refused"))
    }

    async fn count(&self, _collection: &str) -> Result<usize> {
        Err(Error::unavailable("connection refused"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

pub fn pipeline_with(
    store: Arc<dyn VectorStoreProvider>,
    generator: Arc<StubGenerator>,
) -> RagPipeline {
    RagPipeline::new(
        Arc::new(HashEmbedder),
        store,
        generator,
        PipelineSettings::default(),
    )
    .unwrap()
}

/// App state over an in-memory store and the stub generator
pub fn test_state() -> (AppState, Arc<InMemoryVectorStore>, Arc<StubGenerator>) {
    test_state_with(RagConfig::default())
}

pub fn test_state_with(
    config: RagConfig,
) -> (AppState, Arc<InMemoryVectorStore>, Arc<StubGenerator>) {
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(StubGenerator::new());
    let state = AppState::new(config, pipeline_with(store.clone(), generator.clone()));
    (state, store, generator)
}

/// Serve `state` on an ephemeral port
pub async fn spawn_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    spawn_router(build_router(state)).await
}

/// Serve any router on an ephemeral port
pub async fn spawn_router(app: Router) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

/// Address nothing listens on
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    drop(listener);
    format!("http://{}", addr)
}

/// A PDF with one text line per page
pub fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}
