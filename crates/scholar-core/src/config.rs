//! Configuration types for chunking, retrieval, models, storage, and execution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Env var overriding the engine state directory.
const ENV_SCHOLAR_FOLDER: &str = "SCHOLAR_FOLDER";
/// Env var pointing at an explicit config file.
const ENV_SCHOLAR_CONFIG: &str = "SCHOLAR_CONFIG";

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chunking parameters for ingestion.
    pub chunking: ChunkingConfig,
    /// Retrieval parameters.
    pub retrieval: RetrievalConfig,
    /// Model selection and credentials.
    pub models: ModelConfig,
    /// On-disk state locations.
    pub storage: StorageConfig,
    /// Workflow execution limits.
    pub execution: ExecutionConfig,
}

/// Chunking parameters for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub size: usize,
    /// Characters of context shared between consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 800,
            overlap: 100,
        }
    }
}

/// Retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of neighbors fetched when the caller does not specify `k`.
    pub default_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_k: 5 }
    }
}

/// Model selection and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Embedding model served by the local Ollama daemon.
    pub embedding_model: String,
    /// Generator model routed through the provider.
    pub generator_model: String,
    /// OpenRouter API key; falls back to the environment when absent.
    pub openrouter_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_model: "nomic-embed-text".to_owned(),
            generator_model: "qwen/qwen-2.5-72b-instruct".to_owned(),
            openrouter_key: None,
        }
    }
}

/// On-disk state locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding all engine state.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".scholar"),
        }
    }
}

/// Workflow execution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Per-node time budget in seconds.
    pub node_timeout_secs: u64,
    /// Attempts for persistence writes before surfacing the failure.
    pub persistence_max_attempts: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            node_timeout_secs: 120,
            persistence_max_attempts: 3,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `SCHOLAR_CONFIG`, the user config directory,
    /// or defaults when neither exists.
    ///
    /// # Errors
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = env::var(ENV_SCHOLAR_CONFIG) {
            return Self::load(Path::new(&path));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("scholar").join("config.toml");
            if path.exists() {
                return Self::load(&path);
            }
        }

        Ok(Self::default())
    }

    /// Checks cross-field invariants.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if chunking or retrieval settings are out of range.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.size == 0 {
            return Err(Error::InvalidParameter(
                "chunking.size must be positive".to_owned(),
            ));
        }
        if self.chunking.overlap >= self.chunking.size {
            return Err(Error::InvalidParameter(format!(
                "chunking.overlap ({}) must be smaller than chunking.size ({})",
                self.chunking.overlap, self.chunking.size
            )));
        }
        if self.retrieval.default_k == 0 {
            return Err(Error::InvalidParameter(
                "retrieval.default_k must be positive".to_owned(),
            ));
        }
        if self.execution.node_timeout_secs == 0 {
            return Err(Error::InvalidParameter(
                "execution.node_timeout_secs must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Resolves the engine state directory, honoring `SCHOLAR_FOLDER`.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        env::var(ENV_SCHOLAR_FOLDER)
            .map_or_else(|_| self.storage.data_dir.clone(), PathBuf::from)
    }

    /// Path of the library snapshot inside the state directory.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.state_dir().join("snapshot").join("library.bin")
    }
}
