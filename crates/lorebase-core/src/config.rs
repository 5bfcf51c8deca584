//! Lorebase configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LorebaseConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for LorebaseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl LorebaseConfig {
    /// Load config from the default path (~/.lorebase/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::LorebaseError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::LorebaseError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::LorebaseError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Lorebase home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lorebase")
    }

    /// API key resolution: config value first, then `OPENAI_API_KEY`.
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            self.api_key.clone()
        } else {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        }
    }

    /// Whether an API key is available for the hosted providers.
    pub fn is_configured(&self) -> bool {
        !self.resolved_api_key().is_empty()
    }

    /// Path of the persisted knowledge store file.
    pub fn knowledge_path(&self) -> PathBuf {
        self.storage.resolved_data_dir().join("knowledge_base.json")
    }
}

/// Chat completion (LLM) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Override for the OpenAI-compatible base URL. Empty means the default.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_model() -> String { "gpt-4o-mini".into() }
fn default_temperature() -> f32 { 0.3 }
fn default_max_tokens() -> u32 { 4000 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            endpoint: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Override for the OpenAI-compatible base URL. Empty means the default.
    #[serde(default)]
    pub endpoint: String,
    /// Optional fixed output width requested from the provider.
    #[serde(default)]
    pub dimensions: Option<usize>,
}

fn default_embedding_model() -> String { "text-embedding-3-small".into() }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            endpoint: String::new(),
            dimensions: None,
        }
    }
}

/// Chunking and retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum chunk length in characters. Large enough to keep whole paragraphs.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Character overlap between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// How many chunks a search returns at most.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum cosine similarity a chunk needs to survive the quality filter.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

fn default_chunk_size() -> usize { 1500 }
fn default_chunk_overlap() -> usize { 200 }
fn default_top_k() -> usize { 8 }
fn default_similarity_threshold() -> f32 { 0.5 }

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Directory holding the persisted knowledge store. Empty means
    /// the Lorebase home directory.
    #[serde(default)]
    pub data_dir: String,
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        if self.data_dir.is_empty() {
            LorebaseConfig::home_dir()
        } else {
            PathBuf::from(&self.data_dir)
        }
    }
}
