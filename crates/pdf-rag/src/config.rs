//! Configuration for the RAG service, bot and uploader
//!
//! Defaults are usable as-is for a local setup. A TOML file can override any
//! section, and a handful of environment variables override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable pointing at an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "PDF_RAG_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Telegram bot configuration
    pub bot: BotConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
    /// Default number of chunks for `/ask`
    pub default_top_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
            default_top_k: 2,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// sentence-transformers model name
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Run inference on the GPU (CUDA execution provider)
    pub use_gpu: bool,
    /// Cache directory for models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            use_gpu: false,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pdf-rag")
                .join("models"),
        }
    }
}

impl EmbeddingConfig {
    /// Directory holding the files of the configured model
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.model.replace('/', "--"))
    }
}

/// Word-window chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per chunk
    pub chunk_size: usize,
    /// Words shared by consecutive chunks
    pub overlap: usize,
    /// Derive point ids from document, page and text so re-ingestion overwrites
    pub dedup_chunks: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            overlap: 50,
            dedup_chunks: false,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: usize,
    /// Context window size (tokens)
    pub context_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Allow the model to be offloaded to the GPU
    pub use_gpu: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "phi3".to_string(),
            temperature: 0.1,
            max_tokens: 256,
            context_size: 2048,
            timeout_secs: 120,
            use_gpu: false,
        }
    }
}

/// Vector database (Qdrant) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Qdrant gRPC URL
    pub url: String,
    /// Optional API key
    pub api_key: Option<String>,
    /// Collection holding the PDF chunks
    pub collection: String,
    /// Connect and request timeout in seconds
    pub timeout_secs: u64,
    /// Points per upsert request in the batch uploader
    pub upload_batch_size: usize,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "pdfminer_all-MiniLM-L6-v2".to_string(),
            timeout_secs: 30,
            upload_batch_size: 512,
        }
    }
}

/// Telegram bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot API token
    pub token: Option<String>,
    /// Base URL of the RAG HTTP service
    pub api_url: String,
    /// Telegram Bot API base URL
    pub telegram_url: String,
    /// Chunks requested per question
    pub top_k: usize,
    /// Long-polling timeout in seconds
    pub poll_timeout_secs: u64,
    /// Idle time after which a chat's last answer is forgotten
    pub session_ttl_secs: u64,
    /// Maximum number of chats kept in memory
    pub max_sessions: usize,
    /// JSON-lines file receiving answer ratings
    pub feedback_log: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "http://localhost:8000".to_string(),
            telegram_url: "https://api.telegram.org".to_string(),
            top_k: 2,
            poll_timeout_secs: 30,
            session_ttl_secs: 3600,
            max_sessions: 10_000,
            feedback_log: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pdf-rag")
                .join("feedback.jsonl"),
        }
    }
}

impl RagConfig {
    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Load configuration: explicit path, else `PDF_RAG_CONFIG`, else defaults,
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.bot.token = Some(token);
        }
        if let Some(url) = get("API_URL") {
            self.bot.api_url = url.trim_end_matches('/').to_string();
        }

        if let Some(url) = get("QDRANT_URL") {
            self.vector_db.url = url;
        } else if get("QDRANT_HOST").is_some() || get("QDRANT_PORT").is_some() {
            let host = get("QDRANT_HOST").unwrap_or_else(|| "localhost".to_string());
            let port = get("QDRANT_PORT").unwrap_or_else(|| "6334".to_string());
            parse_number::<u16>("QDRANT_PORT", &port)?;
            self.vector_db.url = format!("http://{}:{}", host, port);
        }
        if let Some(key) = get("QDRANT_API_KEY") {
            self.vector_db.api_key = Some(key);
        }
        if let Some(collection) = get("RAG_COLLECTION") {
            self.vector_db.collection = collection;
        }

        if let Some(model) = get("EMBEDDING_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(model) = get("GENERATOR_MODEL") {
            self.llm.generate_model = model;
        }
        if let Some(url) = get("OLLAMA_URL") {
            self.llm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(flag) = get("USE_GPU") {
            let use_gpu = parse_flag("USE_GPU", &flag)?;
            self.embeddings.use_gpu = use_gpu;
            self.llm.use_gpu = use_gpu;
        }

        if let Some(host) = get("RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("RAG_PORT") {
            self.server.port = parse_number("RAG_PORT", &port)?;
        }

        Ok(())
    }

    /// Sanity checks that would otherwise surface later as confusing runtime errors
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 || self.chunking.overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfiguration(format!(
                "chunk_size ({}) must be greater than overlap ({})",
                self.chunking.chunk_size, self.chunking.overlap
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embedding dimensions must be positive".to_string()));
        }
        if self.vector_db.upload_batch_size == 0 {
            return Err(Error::Config("upload_batch_size must be positive".to_string()));
        }
        if self.vector_db.collection.trim().is_empty() {
            return Err(Error::Config("collection name is empty".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, value))),
    }
}
