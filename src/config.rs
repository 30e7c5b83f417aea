//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working setup with the offline hashing embedder.
//!
//! ```toml
//! [chunking]
//! max_chunk_size = 500
//! chunk_overlap = 100
//! strip_comments = true
//!
//! [detection]
//! similarity_threshold = 0.80
//! top_k = 5
//! top_matches_limit = 10
//! timeout_secs = 30
//!
//! [embedding]
//! provider = "hashing"   # hashing | openai | ollama | local
//! dims = 384
//!
//! [limits]
//! max_file_bytes = 10485760
//!
//! [store]
//! snapshot = "./plagscan.json"
//!
//! [logging]
//! level = "warn"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use plagscan_core::chunk::ChunkParams;
use plagscan_core::matcher::DetectionParams;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Words per chunk.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Words shared by consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Strip comments and collapse whitespace before embedding.
    #[serde(default = "default_true")]
    pub strip_comments: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            strip_comments: true,
        }
    }
}

fn default_max_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    100
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// Minimum best-match similarity for a chunk to be flagged.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Neighbours retrieved per chunk.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Cap on the report's overall top-matches list.
    #[serde(default = "default_top_matches_limit")]
    pub top_matches_limit: usize,
    /// Bound on each embedding or index call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
            top_matches_limit: default_top_matches_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.80
}
fn default_top_k() -> usize {
    5
}
fn default_top_matches_limit() -> usize {
    10
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Vector width, fixed for the life of the process and of any snapshot.
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-request HTTP timeout for remote providers.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "hashing".to_string()
}
fn default_dims() -> usize {
    384
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// JSON snapshot the CLI loads before and saves after each command.
    #[serde(default = "default_snapshot")]
    pub snapshot: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot: default_snapshot(),
        }
    }
}

fn default_snapshot() -> PathBuf {
    PathBuf::from("./plagscan.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"warn"` or `"plagscan=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.chunk_params()?;
        self.detection_params()?;

        if self.detection.timeout_secs == 0 {
            bail!("detection.timeout_secs must be > 0");
        }
        if self.embedding.dims == 0 {
            bail!("embedding.dims must be > 0");
        }
        if self.limits.max_file_bytes == 0 {
            bail!("limits.max_file_bytes must be > 0");
        }

        match self.embedding.provider.as_str() {
            "hashing" | "openai" | "ollama" | "local" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be hashing, openai, ollama, or local.",
                other
            ),
        }
        if matches!(self.embedding.provider.as_str(), "openai" | "ollama")
            && self.embedding.model.is_none()
        {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                self.embedding.provider
            );
        }

        Ok(())
    }

    pub fn chunk_params(&self) -> Result<ChunkParams> {
        ChunkParams::new(self.chunking.max_chunk_size, self.chunking.chunk_overlap)
            .context("invalid [chunking] section")
    }

    pub fn detection_params(&self) -> Result<DetectionParams> {
        DetectionParams::new(
            self.detection.similarity_threshold,
            self.detection.top_k,
            self.detection.top_matches_limit,
        )
        .context("invalid [detection] section")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.detection.timeout_secs)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.chunking.max_chunk_size, 500);
        assert_eq!(cfg.chunking.chunk_overlap, 100);
        assert!(cfg.chunking.strip_comments);
        assert_eq!(cfg.detection.top_k, 5);
        assert!((cfg.detection.similarity_threshold - 0.80).abs() < 1e-12);
        assert_eq!(cfg.embedding.provider, "hashing");
        assert_eq!(cfg.embedding.dims, 384);
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn test_overrides_are_read() {
        let file = write_config(
            r#"
[chunking]
max_chunk_size = 40
chunk_overlap = 8

[detection]
similarity_threshold = 0.9
top_k = 3

[embedding]
dims = 64
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.chunk_params().unwrap().stride(), 32);
        assert_eq!(cfg.detection_params().unwrap().top_k(), 3);
        assert_eq!(cfg.embedding.dims, 64);
    }

    #[test]
    fn test_overlap_not_smaller_than_chunk_rejected() {
        let file = write_config("[chunking]\nmax_chunk_size = 10\nchunk_overlap = 10\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("chunk_overlap"));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let file = write_config("[detection]\nsimilarity_threshold = 1.5\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let file = write_config("[embedding]\nprovider = \"magic\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_remote_provider_requires_model() {
        let file = write_config("[embedding]\nprovider = \"openai\"\ndims = 1536\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.store.snapshot, PathBuf::from("./plagscan.json"));
    }
}
