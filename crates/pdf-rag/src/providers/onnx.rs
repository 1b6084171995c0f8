//! ONNX-based sentence embeddings
//!
//! Runs a sentence-transformers model (all-MiniLM-L6-v2 by default) with mean
//! pooling and L2 normalisation. Model and tokenizer are downloaded from the
//! Hugging Face hub on first use and cached on disk.

use async_trait::async_trait;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Loaded model state; inference needs exclusive access
struct OnnxModel {
    session: Session,
    tokenizer: Tokenizer,
    max_length: usize,
    batch_size: usize,
}

/// ONNX-based text embedder
pub struct OnnxEmbedder {
    model: Arc<Mutex<OnnxModel>>,
    dimensions: usize,
    model_name: String,
}

impl OnnxEmbedder {
    /// Load (downloading if needed) the configured model
    ///
    /// Fails with a configuration error when the model's hidden size differs
    /// from `config.dimensions`, so collections are never created with the
    /// wrong vector size.
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!(
            "Initializing ONNX embedder with model: {} (gpu: {})",
            config.model,
            config.use_gpu
        );

        let model_dir = config.model_dir();
        std::fs::create_dir_all(&model_dir).map_err(|e| {
            Error::Config(format!("Failed to create cache directory: {}", e))
        })?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let repo = hub_repo(&config.model);

        if !model_path.exists() {
            download(&repo, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download(&repo, "tokenizer.json", &tokenizer_path).await?;
        }

        let mut builder = Session::builder()
            .map_err(|e| Error::Embedding(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::Embedding(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::Embedding(format!("Failed to set threads: {}", e)))?;

        if config.use_gpu {
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| Error::Embedding(format!("Failed to enable CUDA: {}", e)))?;
        }

        let session = builder
            .commit_from_file(&model_path)
            .map_err(|e| Error::Embedding(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Embedding(format!("Failed to load tokenizer: {}", e)))?;

        let mut model = OnnxModel {
            session,
            tokenizer,
            max_length: config.max_length,
            batch_size: config.batch_size.max(1),
        };

        let sample = model.embed_batch(&["dimension check"])?;
        let actual = sample.first().map(Vec::len).unwrap_or(0);
        if actual != config.dimensions {
            return Err(Error::Config(format!(
                "Model {} produces {}-dimensional embeddings, config declares {}",
                config.model, actual, config.dimensions
            )));
        }

        tracing::info!("ONNX embedder initialized ({} dimensions)", actual);

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimensions: actual,
            model_name: config.model.clone(),
        })
    }

    /// Model identifier
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            model.lock().embed_batch(&refs)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

impl OnnxModel {
    /// Embed texts in batches of `batch_size`
    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.embed_batch_internal(batch)?);
        }
        Ok(all_embeddings)
    }

    fn embed_batch_internal(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Embedding(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(max_len) {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let shape = vec![batch_size, max_len];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| Error::Embedding(format!("Input tensor creation failed: {}", e)))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
                .map_err(|e| {
                    Error::Embedding(format!("Attention mask tensor creation failed: {}", e))
                })?;
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice())).map_err(|e| {
                Error::Embedding(format!("Token type tensor creation failed: {}", e))
            })?;

        let inputs = vec![
            ("input_ids", input_ids_tensor.into_dyn()),
            ("attention_mask", attention_mask_tensor.into_dyn()),
            ("token_type_ids", token_type_ids_tensor.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::Embedding(format!("Inference failed: {}", e)))?;

        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::Embedding("No output tensor".to_string()))?;

        let (tensor_shape, tensor_data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Embedding(format!("Failed to extract tensor: {}", e)))?;

        let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
        let hidden_size = dims
            .get(2)
            .copied()
            .ok_or_else(|| Error::Embedding(format!("Unexpected output shape {:?}", dims)))?;

        Ok((0..batch_size)
            .map(|i| {
                mean_pool(
                    tensor_data,
                    &attention_mask[i * max_len..(i + 1) * max_len],
                    i * max_len * hidden_size,
                    hidden_size,
                )
            })
            .collect())
    }
}

/// Attention-masked mean over token states, L2-normalised
fn mean_pool(data: &[f32], mask: &[i64], offset: usize, hidden_size: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;

    for (j, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        let row = offset + j * hidden_size;
        for (k, acc) in sum.iter_mut().enumerate() {
            if let Some(v) = data.get(row + k) {
                *acc += v;
            }
        }
        count += 1.0;
    }

    if count > 0.0 {
        for val in &mut sum {
            *val /= count;
        }
    }

    let norm: f32 = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in &mut sum {
            *val /= norm;
        }
    }

    sum
}

/// Hugging Face repository for a model identifier
fn hub_repo(model: &str) -> String {
    if model.contains('/') {
        model.to_string()
    } else {
        format!("sentence-transformers/{}", model)
    }
}

/// Download a file from a Hugging Face repository
async fn download(repo: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!("https://huggingface.co/{}/resolve/main/{}", repo, file);
    tracing::info!("Downloading {}", url);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::Embedding(format!("Failed to download {}: {}", file, e)))?;

    if !response.status().is_success() {
        return Err(Error::Embedding(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Embedding(format!("Failed to read {}: {}", file, e)))?;

    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| Error::Embedding(format!("Failed to save {}: {}", file, e)))?;

    tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_repo() {
        assert_eq!(hub_repo("all-MiniLM-L6-v2"), "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(hub_repo("BAAI/bge-small-en-v1.5"), "BAAI/bge-small-en-v1.5");
    }

    #[test]
    fn test_mean_pool_ignores_padding_and_normalises() {
        // two tokens of hidden size 2, second token is padding
        let data = [3.0, 4.0, 100.0, 100.0];
        let pooled = mean_pool(&data, &[1, 0], 0, 2);
        assert!((pooled[0] - 0.6).abs() < 1e-6);
        assert!((pooled[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let pooled = mean_pool(&[1.0, 2.0], &[0], 0, 2);
        assert_eq!(pooled, vec![0.0, 0.0]);
    }
}
