use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
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
    "disabled".to_string()
}
fn default_dims() -> usize {
    1024
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Semantic matches at or below this cosine similarity are discarded.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// The semantic path returns at most this many contacts.
    #[serde(default = "default_semantic_top_k")]
    pub semantic_top_k: usize,
    /// Page size for listings when the caller gives no limit.
    #[serde(default = "default_list_limit")]
    pub default_limit: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            semantic_top_k: default_semantic_top_k(),
            default_limit: default_list_limit(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.5
}
fn default_semantic_top_k() -> usize {
    10
}
fn default_list_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !(0.0..=1.0).contains(&config.search.similarity_threshold) {
        anyhow::bail!("search.similarity_threshold must be in [0.0, 1.0]");
    }
    if config.search.semantic_top_k == 0 {
        anyhow::bail!("search.semantic_top_k must be >= 1");
    }
    if config.search.default_limit < 0 {
        anyhow::bail!("search.default_limit must be >= 0");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims == 0 {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(config)
}
