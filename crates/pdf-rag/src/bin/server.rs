//! RAG HTTP server binary
//!
//! Run with: cargo run -p pdf-rag --bin pdf-rag-server

use clap::Parser;
use pdf_rag::{
    config::RagConfig,
    server::{state::AppState, RagServer},
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pdf-rag-server", version, about = "Question answering over uploaded PDFs")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "PDF_RAG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                         PDF RAG                           ║
║          Questions answered from your own PDFs            ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config = RagConfig::load(args.config.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!("  - Qdrant: {}", config.vector_db.url);
    tracing::info!("  - Collection: {}", config.vector_db.collection);
    tracing::info!(
        "  - Chunking: {} words, {} overlap",
        config.chunking.chunk_size,
        config.chunking.overlap
    );

    let state = AppState::connect(config).await?;
    let server = RagServer::new(state);

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload_pdf - Upload a PDF");
    println!("  POST /ask        - Ask a question");
    println!("  GET  /info       - Endpoint listing");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
