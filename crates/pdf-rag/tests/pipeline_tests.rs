//! End-to-end pipeline behaviour over the in-memory store

mod common;

use std::sync::Arc;

use common::{pipeline_with, sample_pdf, HashEmbedder, StubGenerator, UnreachableStore, STUB_ANSWER};
use pdf_rag::generation::FALLBACK_ANSWER;
use pdf_rag::ingestion::PageText;
use pdf_rag::providers::{InMemoryVectorStore, VectorStoreProvider};
use pdf_rag::Error;

const COLLECTION: &str = "pdfminer_all-MiniLM-L6-v2";

fn manual_pages() -> Vec<PageText> {
    vec![
        PageText::new(1, "The widget is assembled from a blue frame and two steel bolts."),
        PageText::new(2, "Gearboxes require synthetic oil every six months of operation."),
        PageText::new(3, "Warranty claims are handled by the regional service office."),
    ]
}

#[tokio::test]
async fn ingest_three_pages_yields_three_chunks() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store.clone(), Arc::new(StubGenerator::new()));

    let report = pipeline
        .ingest_pages("manual", &manual_pages(), COLLECTION)
        .await
        .unwrap();

    assert_eq!(report.document, "manual");
    assert_eq!(report.pages, 3);
    assert_eq!(report.chunks, 3);
    assert_eq!(store.count(COLLECTION).await.unwrap(), 3);
    assert_eq!(
        store.collection_dimensions(COLLECTION).await.unwrap(),
        Some(common::DIMS)
    );
}

#[tokio::test]
async fn answer_uses_closest_chunks_in_rank_order() {
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(StubGenerator::new());
    let pipeline = pipeline_with(store, generator.clone());
    pipeline
        .ingest_pages("manual", &manual_pages(), COLLECTION)
        .await
        .unwrap();

    let answer = pipeline
        .generate_answer("How often do gearboxes need synthetic oil?", COLLECTION, 1)
        .await
        .unwrap();

    assert_eq!(answer.chunks.len(), 1);
    assert!(answer.chunks[0].starts_with("manual: Gearboxes"));
    assert_eq!(answer.answer, STUB_ANSWER);

    let prompts = generator.prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Question: How often do gearboxes need synthetic oil?"));
    assert!(prompts[0].contains(&answer.chunks[0]));
}

#[tokio::test]
async fn verbatim_question_retrieves_its_chunk() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store, Arc::new(StubGenerator::new()));
    let pages = manual_pages();
    pipeline.ingest_pages("manual", &pages, COLLECTION).await.unwrap();

    let question = format!("manual: {}", pages[2].text);
    let answer = pipeline.generate_answer(&question, COLLECTION, 1).await.unwrap();
    assert_eq!(answer.chunks, vec![question]);
}

#[tokio::test]
async fn top_k_bounds_returned_chunks() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store, Arc::new(StubGenerator::new()));
    pipeline
        .ingest_pages("manual", &manual_pages(), COLLECTION)
        .await
        .unwrap();

    let answer = pipeline
        .generate_answer("widget frame", COLLECTION, 2)
        .await
        .unwrap();
    assert_eq!(answer.chunks.len(), 2);

    let answer = pipeline
        .generate_answer("widget frame", COLLECTION, 10)
        .await
        .unwrap();
    assert_eq!(answer.chunks.len(), 3);
}

#[tokio::test]
async fn missing_collection_answers_with_fallback() {
    let generator = Arc::new(StubGenerator::new());
    let pipeline = pipeline_with(Arc::new(InMemoryVectorStore::new()), generator.clone());

    let answer = pipeline
        .generate_answer("What is X?", "never-created", 2)
        .await
        .unwrap();

    assert_eq!(answer.question, "What is X?");
    assert!(answer.chunks.is_empty());
    assert_eq!(answer.answer, FALLBACK_ANSWER);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn generator_failure_surfaces() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store, Arc::new(StubGenerator::failing()));
    pipeline
        .ingest_pages("manual", &manual_pages(), COLLECTION)
        .await
        .unwrap();

    let err = pipeline
        .generate_answer("widget", COLLECTION, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
}

#[tokio::test]
async fn unreachable_store_is_unavailable() {
    let pipeline = pipeline_with(Arc::new(UnreachableStore), Arc::new(StubGenerator::new()));

    let err = pipeline
        .generate_answer("widget", COLLECTION, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamUnavailable(_)));

    let err = pipeline
        .ingest_pages("manual", &manual_pages(), COLLECTION)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn blank_pdf_pages_store_nothing() {
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store.clone(), Arc::new(StubGenerator::new()));

    let report = pipeline
        .ingest_pages("empty", &[PageText::new(1, "   "), PageText::new(2, "tiny")], COLLECTION)
        .await
        .unwrap();

    assert_eq!(report.chunks, 0);
    assert_eq!(store.count(COLLECTION).await.unwrap(), 0);
}

#[tokio::test]
async fn add_pdf_reads_pages_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("field-guide.pdf");
    std::fs::write(
        &path,
        sample_pdf(&[
            "Owls hunt at night using silent feathers and sharp hearing.",
            "Herons wade in shallow water waiting for passing fish.",
        ]),
    )
    .unwrap();

    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(store.clone(), Arc::new(StubGenerator::new()));
    let report = pipeline.add_pdf(&path, COLLECTION).await.unwrap();

    assert_eq!(report.document, "field-guide");
    assert!(report.chunks >= 1);
    assert_eq!(store.count(COLLECTION).await.unwrap(), report.chunks);

    let query = HashEmbedder::vector("owls hunt at night");
    let hits = store.search(COLLECTION, &query, 1).await.unwrap();
    assert!(hits[0].payload.text.starts_with("field-guide: "));
    assert!(hits[0].payload.text.contains("Owls"));
}

#[tokio::test]
async fn add_pdf_rejects_non_pdf_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, b"just some text, not a pdf").unwrap();

    let pipeline = pipeline_with(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(StubGenerator::new()),
    );
    let err = pipeline.add_pdf(&path, COLLECTION).await.unwrap_err();
    assert!(matches!(err, Error::FileParse { .. }));
}
