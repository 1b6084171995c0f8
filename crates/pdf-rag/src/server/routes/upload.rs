//! PDF upload endpoint

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection}, Multipart, State,
    },
    http::StatusCode,
    Json,
};
use std::path::Path;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// POST /upload_pdf - Store a PDF in the collection
pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| Error::invalid_input(e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_input("File field has no file name"))?;

        if !is_pdf_name(&filename) {
            return Err(Error::invalid_input("Only PDF files are accepted"));
        }

        let data = field.bytes().await.map_err(read_error)?;

        tracing::info!("Received {} ({} bytes)", filename, data.len());

        let scratch = tempfile::tempdir()?;
        let path = scratch.path().join(sanitize_filename(&filename));
        tokio::fs::write(&path, &data).await?;

        let report = state
            .pipeline()
            .add_pdf(&path, state.collection())
            .await?;

        return Ok(Json(report.into()));
    }

    Err(Error::invalid_input("Missing multipart field 'file'"))
}

/// Body-limit overruns are 413, anything else is a malformed request
fn read_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(e.body_text())
    } else {
        Error::invalid_input(format!("Failed to read upload: {}", e.body_text()))
    }
}

fn is_pdf_name(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}

/// Base name of an uploaded file with path separators and control characters removed
fn sanitize_filename(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}
