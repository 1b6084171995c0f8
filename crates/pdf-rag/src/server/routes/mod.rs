//! API routes for the RAG server

pub mod ask;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload_pdf",
            post(upload::upload_pdf).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ask", post(ask::ask))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "pdf-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over uploaded PDF documents",
        "endpoints": {
            "POST /upload_pdf": "Upload a PDF (multipart field 'file') into the collection",
            "POST /ask": "Answer a question (form fields 'query', 'top_k')",
            "GET /health": "Liveness",
            "GET /ready": "Vector store reachability"
        }
    }))
}
