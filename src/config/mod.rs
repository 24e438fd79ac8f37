//! Configuration system for docsage
//!
//! Supports loading configuration from:
//! 1. CLI --config argument
//! 2. ~/.config/docsage/config.{DOCSAGE_ENV}.json
//! 3. Default values
//!
//! Where DOCSAGE_ENV can be: production (default), development, test
//!
//! # Examples
//!
//! ```no_run
//! use docsage::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! println!("Answer model: {} via {}", config.answer_model.model, config.answer_model.provider);
//! # Ok(())
//! # }
//! ```
//!
//! ```
//! use docsage::config::{AppConfig, ModelProvider};
//!
//! let mut config = AppConfig::default();
//! config.answer_model.provider = ModelProvider::OpenAI;
//! config.answer_model.model = "gpt-4o-mini".to_string();
//! config.answer_model.api_key = Some("OPENAI_API_KEY".to_string());
//! config.validate().unwrap();
//! ```
//!
//! ## Environment Variables
//!
//! Environment variables override config file values:
//! - DOCSAGE_OLLAMA_URL
//! - DOCSAGE_ANSWER_MODEL
//! - DOCSAGE_PARAPHRASE_MODEL
//! - DOCSAGE_CONCEPT_THRESHOLD

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Ollama,
    OpenAI,
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Configuration for a generation model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider type
    pub provider: ModelProvider,

    /// API URL (for Ollama) or base URL
    #[serde(default = "default_ollama_url")]
    pub url: String,

    /// Model name
    pub model: String,

    /// API key (can be environment variable name like "OPENAI_API_KEY")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Temperature used when a call does not set its own (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top P sampling (0.0 - 1.0)
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum tokens to generate when a call does not set its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_top_p() -> f32 {
    0.9
}

fn default_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Ollama,
            url: default_ollama_url(),
            model: "qwen3:0.6b".to_string(),
            api_key: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ModelConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::ValidationError(format!(
                "Top P must be between 0.0 and 1.0, got {}",
                self.top_p
            )));
        }

        if self.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "URL cannot be empty".to_string(),
            ));
        }

        if self.model.is_empty() {
            return Err(ConfigError::ValidationError(
                "Model name cannot be empty".to_string(),
            ));
        }

        if self.provider != ModelProvider::Ollama && self.api_key.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "API key required for {} provider",
                self.provider
            )));
        }

        Ok(())
    }

    /// Resolve API key from environment variable if needed
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.as_ref().and_then(|key| {
            // If the key looks like an env var name, try to resolve it
            if key.chars().all(|c| c.is_uppercase() || c == '_') {
                std::env::var(key).ok()
            } else {
                Some(key.clone())
            }
        })
    }
}

/// Embedding model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Sentence-transformers model name (see `embedding::resolve_model`)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Number of cached text vectors
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_cache_size() -> usize {
    1000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_size: default_cache_size(),
        }
    }
}

/// Chunking and retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_retrieval_top_k")]
    pub top_k: usize,
}

fn default_chunk_size() -> usize {
    crate::search::DEFAULT_CHUNK_SIZE
}

fn default_retrieval_top_k() -> usize {
    crate::search::DEFAULT_TOP_K
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            top_k: default_retrieval_top_k(),
        }
    }
}

/// Keyword extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_keyword_top_k")]
    pub top_k: usize,

    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    #[serde(default = "default_dedup_limit")]
    pub dedup_limit: f64,

    #[serde(default = "default_language")]
    pub language: String,
}

fn default_keyword_top_k() -> usize {
    15
}

fn default_ngram_max() -> usize {
    2
}

fn default_dedup_limit() -> f64 {
    0.8
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            top_k: default_keyword_top_k(),
            ngram_max: default_ngram_max(),
            dedup_limit: default_dedup_limit(),
            language: default_language(),
        }
    }
}

/// Concept linking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptConfig {
    /// Cosine similarity needed to link two keywords
    #[serde(default = "default_concept_threshold")]
    pub threshold: f32,
}

fn default_concept_threshold() -> f32 {
    0.55
}

impl Default for ConceptConfig {
    fn default() -> Self {
        Self {
            threshold: default_concept_threshold(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Model that answers questions
    pub answer_model: ModelConfig,

    /// Model that paraphrases summary sentences
    pub paraphrase_model: ModelConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub keywords: KeywordConfig,

    #[serde(default)]
    pub concepts: ConceptConfig,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            answer_model: ModelConfig {
                model: "qwen3:8b".to_string(),
                temperature: 0.7,
                ..Default::default()
            },
            paraphrase_model: ModelConfig {
                model: "qwen3:0.6b".to_string(),
                temperature: 0.0,
                ..Default::default()
            },
            retrieval: RetrievalConfig::default(),
            keywords: KeywordConfig::default(),
            concepts: ConceptConfig::default(),
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/docsage/config.{DOCSAGE_ENV}.json
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::from_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        let env = std::env::var("DOCSAGE_ENV").unwrap_or_else(|_| "production".to_string());

        if let Some(config_dir) = Self::config_dir() {
            let config_path = config_dir.join(format!("config.{}.json", env));

            if config_path.exists() {
                tracing::info!("Loading config from: {:?}", config_path);
                return Self::from_file(&config_path);
            }
        }

        tracing::info!("Using default configuration with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DOCSAGE_OLLAMA_URL") {
            if self.answer_model.provider == ModelProvider::Ollama {
                self.answer_model.url = url.clone();
            }
            if self.paraphrase_model.provider == ModelProvider::Ollama {
                self.paraphrase_model.url = url;
            }
        }

        if let Ok(model) = std::env::var("DOCSAGE_ANSWER_MODEL") {
            self.answer_model.model = model;
        }

        if let Ok(model) = std::env::var("DOCSAGE_PARAPHRASE_MODEL") {
            self.paraphrase_model.model = model;
        }

        if let Ok(raw) = std::env::var("DOCSAGE_CONCEPT_THRESHOLD") {
            match raw.parse::<f32>() {
                Ok(threshold) => self.concepts.threshold = threshold,
                Err(_) => tracing::warn!("Ignoring DOCSAGE_CONCEPT_THRESHOLD={:?}", raw),
            }
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.answer_model.validate()?;
        self.paraphrase_model.validate()?;

        if self.embedding.model.is_empty() {
            return Err(ConfigError::ValidationError(
                "embedding.model cannot be empty".to_string(),
            ));
        }

        if self.retrieval.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 || self.keywords.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "top_k values must be greater than 0".to_string(),
            ));
        }

        if self.keywords.ngram_max == 0 {
            return Err(ConfigError::ValidationError(
                "keywords.ngram_max must be greater than 0".to_string(),
            ));
        }

        if !(self.keywords.dedup_limit > 0.0 && self.keywords.dedup_limit <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "keywords.dedup_limit must be in (0, 1], got {}",
                self.keywords.dedup_limit
            )));
        }

        if !(-1.0..=1.0).contains(&self.concepts.threshold) {
            return Err(ConfigError::ValidationError(format!(
                "concepts.threshold must be between -1.0 and 1.0, got {}",
                self.concepts.threshold
            )));
        }

        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("docsage"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.answer_model.provider, ModelProvider::Ollama);
        assert_eq!(config.retrieval.chunk_size, 400);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.keywords.top_k, 15);
        assert!((config.concepts.threshold - 0.55).abs() < f32::EPSILON);
    }

    #[test]
    fn test_model_config_validation() {
        let mut config = ModelConfig::default();
        assert!(config.validate().is_ok());

        config.temperature = 3.0;
        assert!(config.validate().is_err());

        config.temperature = 0.7;
        config.top_p = 1.5;
        assert!(config.validate().is_err());

        config.top_p = 0.9;
        config.provider = ModelProvider::OpenAI;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pipeline_validation() {
        let mut config = AppConfig::default();
        config.retrieval.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.concepts.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.keywords.dedup_limit = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "answer_model": { "provider": "ollama", "model": "llama3" },
            "paraphrase_model": { "provider": "ollama", "model": "llama3" },
            "concepts": { "threshold": 0.6 }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.answer_model.url, "http://localhost:11434");
        assert_eq!(config.retrieval.chunk_size, 400);
        assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
        assert!((config.concepts.threshold - 0.6).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_path_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.test.json");
        let mut config = AppConfig::default();
        config.keywords.top_k = 7;
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.keywords.top_k, 7);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/docsage.json")));
        assert!(matches!(err, Err(ConfigError::ValidationError(_))));
    }
}
