//! Client for the RAG HTTP service

use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{Answer, UploadResponse};

/// Talks to `POST /ask` and `POST /upload_pdf`
#[derive(Clone)]
pub struct RagApiClient {
    client: Client,
    base_url: String,
}

impl RagApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // generation on CPU can be slow; uploads embed whole documents
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask a question
    pub async fn ask(&self, query: &str, top_k: usize) -> Result<Answer> {
        let top_k = top_k.to_string();
        let response = self
            .client
            .post(format!("{}/ask", self.base_url))
            .form(&[("query", query), ("top_k", top_k.as_str())])
            .send()
            .await
            .map_err(|e| Error::unavailable(format!("RAG service unreachable: {}", e)))?;

        decode(response).await
    }

    /// Upload a PDF under `filename`
    pub async fn upload_pdf(&self, filename: &str, data: Vec<u8>) -> Result<UploadResponse> {
        let part = multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload_pdf", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::unavailable(format!("RAG service unreachable: {}", e)))?;

        decode(response).await
    }
}

/// Body of a 2xx response as `T`; any other status is an error
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(Error::unavailable(format!(
            "RAG service returned HTTP {}: {}",
            status,
            String::from_utf8_lossy(&body)
        )));
    }

    Ok(serde_json::from_slice(&body)?)
}
