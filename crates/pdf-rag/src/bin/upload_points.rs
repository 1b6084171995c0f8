//! Bulk point uploader
//!
//! Run with: cargo run -p pdf-rag --bin pdf-rag-upload -- --archive points.jsonl

use clap::Parser;
use pdf_rag::{
    config::RagConfig,
    providers::QdrantStore,
    upload::{BatchUploader, PointsArchive},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "pdf-rag-upload",
    version,
    about = "Upload pre-embedded points into a Qdrant collection"
)]
struct Args {
    /// Points as JSON lines, or a JSON array when the file ends in .json
    #[arg(short, long)]
    archive: PathBuf,

    /// Target collection (defaults to the configured one)
    #[arg(long)]
    collection: Option<String>,

    /// Points per upsert request (defaults to the configured batch size)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// TOML configuration file
    #[arg(short, long, env = "PDF_RAG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = RagConfig::load(args.config.as_deref())?;

    let collection = args
        .collection
        .unwrap_or_else(|| config.vector_db.collection.clone());
    let batch_size = args
        .batch_size
        .unwrap_or(config.vector_db.upload_batch_size);

    let archive = PointsArchive::load(&args.archive)?;
    println!("Loaded {} points", archive.len());

    let store = Arc::new(QdrantStore::new(&config.vector_db)?);
    let uploader = BatchUploader::new(store, batch_size)?.with_progress(true);
    let summary = uploader.upload(&collection, &archive).await?;

    if summary.created {
        println!("Collection {} created", collection);
    }
    println!(
        "Uploaded {} points to {} in {} batches",
        summary.points, collection, summary.batches
    );

    Ok(())
}
