//! Ollama client for answer generation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::llm::LlmProvider;

/// Text generation through a local Ollama server
///
/// Requests are made once; a failed call surfaces as a generation error.
pub struct OllamaGenerator {
    client: Client,
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
    num_ctx: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_gpu: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    /// Create a generator for the configured model
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn options(&self, max_tokens: usize) -> GenerateOptions {
        GenerateOptions {
            temperature: self.config.temperature,
            num_predict: max_tokens,
            num_ctx: self.config.context_size,
            // zero offloaded layers keeps inference on the CPU
            num_gpu: (!self.config.use_gpu).then_some(0),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaGenerator {
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let url = format!("{}/api/generate", self.config.base_url.trim_end_matches('/'));
        let request = GenerateRequest {
            model: &self.config.generate_model,
            prompt,
            stream: false,
            options: self.options(max_tokens),
        };

        tracing::debug!(
            model = %self.config.generate_model,
            prompt_chars = prompt.len(),
            max_tokens,
            "Requesting generation"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "Generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Failed to parse generation response: {}", e)))?;

        Ok(generated.response)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url.trim_end_matches('/'));

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.generate_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_only_sets_num_gpu() {
        let config = LlmConfig {
            use_gpu: false,
            ..LlmConfig::default()
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        let options = serde_json::to_value(generator.options(64)).unwrap();
        assert_eq!(options["num_predict"], 64);
        assert_eq!(options["num_gpu"], 0);
    }

    #[test]
    fn test_gpu_leaves_num_gpu_unset() {
        let config = LlmConfig {
            use_gpu: true,
            ..LlmConfig::default()
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        let options = serde_json::to_value(generator.options(256)).unwrap();
        assert!(options.get("num_gpu").is_none());
        assert_eq!(options["num_ctx"], config.context_size);
    }
}
