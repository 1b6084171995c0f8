//! Error types for the RAG service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (bad config file, unusable settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chunker settings that cannot make progress
    #[error("Invalid chunking configuration: {0}")]
    InvalidConfiguration(String),

    /// Missing or malformed request data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Collection and embedder disagree on vector size
    #[error("Collection '{collection}' has dimension {collection_dim}, embedder produces {embedder_dim}")]
    DimensionMismatch {
        collection: String,
        collection_dim: usize,
        embedder_dim: usize,
    },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Request body over the configured size limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Vector store or RAG service could not be reached
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Vector database rejected the request
    #[error("Vector database error: {0}")]
    VectorDb(String),

    /// Answer generation error
    #[error("Generation failed: {0}")]
    Generation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an upstream-unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable error kind, used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::InvalidConfiguration(_) => "invalid_configuration",
            Error::InvalidInput(_) => "invalid_input",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::FileParse { .. } => "parse_error",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::Embedding(_) => "embedding_error",
            Error::UpstreamUnavailable(_) => "upstream_unavailable",
            Error::VectorDb(_) => "vector_db_error",
            Error::Generation(_) => "generation_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) | Error::InvalidConfiguration(_) | Error::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::FileParse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::DimensionMismatch { .. } => StatusCode::CONFLICT,
            Error::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::VectorDb(_) | Error::Generation(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Embedding(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Error::FileParse { filename, message } => {
                format!("Failed to parse '{}': {}", filename, message)
            }
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", message);
        } else {
            tracing::warn!(kind = self.kind(), "{}", message);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
