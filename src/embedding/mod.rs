//! Embedding provider implementations.
//!
//! Every provider implements [`plagscan_core::embedding::Embedder`]:
//! - **[`HashingEmbedder`]**: deterministic feature hashing; offline, the default.
//! - **[`OpenAIEmbedder`]**: calls the OpenAI embeddings API with batching, retry, and backoff.
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalEmbedder`**: runs a sentence-transformer model locally via fastembed
//!   (requires the `local-embeddings-fastembed` feature).
//!
//! # Provider Selection
//!
//! ```rust
//! # use plagscan::config::EmbeddingConfig;
//! # use plagscan::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "hashing"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "hashing-v1");
//! assert_eq!(embedder.dims(), 384);
//! ```
//!
//! # Retry Strategy
//!
//! The OpenAI and Ollama providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Providers never normalize. The detector validates widths and normalizes
//! every returned vector before it reaches the index.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use plagscan_core::embedding::Embedder;
use plagscan_core::EmbeddingError;

use crate::config::EmbeddingConfig;

pub use plagscan_core::embedding::HashingEmbedder;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Build the embedder named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"hashing"` | [`HashingEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` (feature `local-embeddings-fastembed`) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.dims))),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "Local embedding provider requires --features local-embeddings-fastembed"
        ),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Retry/backoff settings shared by the HTTP providers.
#[derive(Debug, Clone)]
struct HttpSettings {
    client: reqwest::Client,
    batch_size: usize,
    max_retries: u32,
}

impl HttpSettings {
    fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }
}

/// POST `body` to `url`, retrying transient failures, and parse the JSON body.
async fn post_with_retry(
    settings: &HttpSettings,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    label: &str,
) -> Result<serde_json::Value, EmbeddingError> {
    let mut last_err = None;

    for attempt in 0..=settings.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(provider = label, attempt, ?delay, "retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        let mut request = settings
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(key) = bearer {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response.json().await.map_err(|e| {
                        EmbeddingError::Provider(format!("{} returned invalid JSON: {}", label, e))
                    });
                }

                let body_text = response.text().await.unwrap_or_default();
                let message = format!("{} API error {}: {}", label, status, body_text);

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::warn!(provider = label, %status, "transient embedding failure");
                    last_err = Some(message);
                    continue;
                }

                return Err(EmbeddingError::Provider(message));
            }
            Err(e) => {
                tracing::warn!(provider = label, error = %e, "embedding request failed");
                last_err = Some(format!("{} connection error ({}): {}", label, url, e));
                continue;
            }
        }
    }

    Err(EmbeddingError::Unavailable(last_err.unwrap_or_else(|| {
        format!("{} embedding failed after retries", label)
    })))
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST /v1/embeddings` with the configured model. Requires the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    http: HttpSettings,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            dims: config.dims,
            api_key,
            http: HttpSettings::new(config)?,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.http.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_with_retry(
                &self.http,
                OPENAI_EMBEDDINGS_URL,
                Some(&self.api_key),
                &body,
                "OpenAI",
            )
            .await?;
            out.extend(parse_openai_response(&json)?);
        }
        Ok(out)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index` field.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| {
            EmbeddingError::Provider("Invalid OpenAI response: missing data array".to_string())
        })?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                EmbeddingError::Provider("Invalid OpenAI response: missing embedding".to_string())
            })?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, json_floats(embedding)?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). The model must already be pulled.
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    http: HttpSettings,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            model,
            dims: config.dims,
            url: url.trim_end_matches('/').to_string(),
            http: HttpSettings::new(config)?,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let endpoint = format!("{}/api/embed", self.url);
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.http.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_with_retry(&self.http, &endpoint, None, &body, "Ollama").await?;
            out.extend(parse_ollama_response(&json)?);
        }
        Ok(out)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            EmbeddingError::Provider(
                "Invalid Ollama response: missing embeddings array".to_string(),
            )
        })?;

    embeddings
        .iter()
        .map(|embedding| {
            let values = embedding.as_array().ok_or_else(|| {
                EmbeddingError::Provider(
                    "Invalid Ollama response: embedding is not an array".to_string(),
                )
            })?;
            json_floats(values)
        })
        .collect()
}

/// Non-numeric entries are a provider fault, not zeros.
fn json_floats(values: &[serde_json::Value]) -> Result<Vec<f32>, EmbeddingError> {
    values
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                EmbeddingError::Provider(format!("non-numeric embedding component: {}", v))
            })
        })
        .collect()
}

// ============ Local Provider (fastembed) ============

/// Local sentence-transformer inference via fastembed.
///
/// The model is downloaded from Hugging Face on first use and cached; after
/// that embedding runs offline. Inference runs on the blocking pool.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        // Fail fast on unsupported names.
        config_to_fastembed_model(&model_name)?;
        let expected = local_model_dims(&model_name);
        if config.dims != expected {
            bail!(
                "embedding.dims is {} but local model '{}' produces {} dimensions",
                config.dims,
                model_name,
                expected
            );
        }

        Ok(Self {
            model_name,
            dims: config.dims,
            batch_size: config.batch_size.max(1),
            model: Arc::new(std::sync::Mutex::new(None)),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn local_model_dims(name: &str) -> usize {
    match name {
        "bge-base-en-v1.5" | "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
        "multilingual-e5-base" => 768,
        "bge-large-en-v1.5" | "multilingual-e5-large" => 1024,
        _ => 384,
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ),
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model_name = self.model_name.clone();
        let batch_size = self.batch_size;
        let slot = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = slot
                .lock()
                .map_err(|_| EmbeddingError::Unavailable("local model lock poisoned".to_string()))?;
            if guard.is_none() {
                let which = config_to_fastembed_model(&model_name)
                    .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;
                let model = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(which).with_show_download_progress(true),
                )
                .map_err(|e| {
                    EmbeddingError::Unavailable(format!(
                        "Failed to initialize local embedding model: {}",
                        e
                    ))
                })?;
                *guard = Some(model);
            }
            let model = guard
                .as_mut()
                .ok_or_else(|| EmbeddingError::Unavailable("local model not loaded".to_string()))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| EmbeddingError::Provider(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| EmbeddingError::Provider(format!("embedding task failed: {}", e)))?
    }
}
