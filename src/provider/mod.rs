//! Model provider abstraction for text generation
//!
//! Supports:
//! - Ollama (local models)
//! - OpenAI and OpenAI-compatible endpoints
//!
//! Callers describe decoding with [`GenerationOptions`]; each backend maps the
//! options it understands and ignores the rest.
//!
//! # Examples
//!
//! ```no_run
//! use docsage::config::{ModelConfig, ModelProvider as ProviderType};
//! use docsage::provider::{create_provider, GenerationOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ModelConfig {
//!     provider: ProviderType::Ollama,
//!     model: "qwen3:8b".to_string(),
//!     ..Default::default()
//! };
//!
//! let provider = create_provider(config)?;
//! provider.validate_connection().await?;
//! let response = provider
//!     .generate("Hello, world!", &GenerationOptions::default())
//!     .await?;
//! println!("Response: {}", response.content);
//! # Ok(())
//! # }
//! ```

use crate::config::{ModelConfig, ModelProvider as ProviderType};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Decoding options for a single generation call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationOptions {
    /// Upper bound on newly generated tokens
    pub max_new_tokens: Option<usize>,
    /// Upper bound on total output length, in tokens
    pub max_length: Option<usize>,
    /// Beam count for beam search backends
    pub num_beams: Option<usize>,
    /// Sample instead of decoding greedily
    pub do_sample: bool,
    pub temperature: Option<f32>,
    pub repetition_penalty: Option<f32>,
}

impl GenerationOptions {
    /// Token budget: `max_new_tokens` wins over `max_length`
    pub fn token_limit(&self) -> Option<usize> {
        self.max_new_tokens.or(self.max_length)
    }

    /// Effective temperature; greedy decoding maps to 0.0
    pub fn effective_temperature(&self, fallback: f32) -> f32 {
        match (self.do_sample, self.temperature) {
            (true, Some(t)) => t,
            (true, None) => fallback,
            (false, _) => 0.0,
        }
    }
}

/// Response from a model provider
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// Model provider trait
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Generate a completion
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Validate connection to the provider
    async fn validate_connection(&self) -> Result<(), ProviderError>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the provider type
    fn provider_type(&self) -> ProviderType;
}

/// Validate the connection, logging which model answered
pub async fn ensure_available(provider: &dyn ModelProvider) -> Result<(), ProviderError> {
    match provider.validate_connection().await {
        Ok(()) => {
            tracing::info!(
                "{} model {} is reachable",
                provider.provider_type(),
                provider.model_name()
            );
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                "{} model {} unavailable: {}",
                provider.provider_type(),
                provider.model_name(),
                e
            );
            Err(e)
        }
    }
}

/// Create a model provider from configuration
pub fn create_provider(config: ModelConfig) -> Result<Box<dyn ModelProvider>, ProviderError> {
    match config.provider {
        ProviderType::Ollama => Ok(Box::new(OllamaProvider::new(config))),
        ProviderType::OpenAI => Ok(Box::new(OpenAIProvider::new(config)?)),
    }
}

fn build_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .unwrap_or_default()
}

// ============================================================================
// Ollama Provider
// ============================================================================

pub struct OllamaProvider {
    config: ModelConfig,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: ModelConfig) -> Self {
        let client = build_client(config.timeout_secs);
        Self { config, client }
    }

    fn options_for(&self, options: &GenerationOptions) -> OllamaOptions {
        OllamaOptions {
            temperature: options.effective_temperature(self.config.temperature),
            top_p: self.config.top_p,
            num_predict: options.token_limit().or(self.config.max_tokens),
            repeat_penalty: options.repetition_penalty,
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_penalty: Option<f32>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    done: bool,
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/generate", self.config.url);

        let request = OllamaRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: Some(self.options_for(options)),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ProviderError::ModelError(format!(
                "HTTP {}: {}",
                status,
                response.text().await?
            )));
        }

        let ollama_response: OllamaResponse = response.json().await?;

        Ok(ProviderResponse {
            content: ollama_response.response,
            model: ollama_response.model,
            finish_reason: Some(if ollama_response.done { "stop" } else { "length" }.to_string()),
        })
    }

    async fn validate_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/tags", self.config.url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::ConnectionError(format!(
                "Failed to connect to Ollama at {}",
                self.config.url
            )));
        }

        Ok(())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }
}

// ============================================================================
// OpenAI Provider
// ============================================================================

pub struct OpenAIProvider {
    config: ModelConfig,
    client: Client,
    api_key: String,
}

impl OpenAIProvider {
    pub fn new(config: ModelConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| ProviderError::AuthError("OpenAI API key not found".to_string()))?;

        let client = build_client(config.timeout_secs);

        Ok(Self {
            config,
            client,
            api_key,
        })
    }

    fn request_for(&self, prompt: &str, options: &GenerationOptions) -> OpenAIRequest {
        OpenAIRequest {
            model: self.config.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: options.effective_temperature(self.config.temperature),
            top_p: self.config.top_p,
            max_tokens: options.token_limit().or(self.config.max_tokens),
            // HF-style repetition penalty is multiplicative around 1.0
            frequency_penalty: options
                .repetition_penalty
                .map(|p| (p - 1.0).clamp(-2.0, 2.0)),
        }
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    model: String,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.config.url);
        let request = self.request_for(prompt, options);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        if response.status() == 401 {
            return Err(ProviderError::AuthError("Invalid API key".to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            return Err(ProviderError::ModelError(format!(
                "HTTP {}: {}",
                status,
                response.text().await?
            )));
        }

        let openai_response: OpenAIResponse = response.json().await?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            model: openai_response.model,
            finish_reason: choice.finish_reason,
        })
    }

    async fn validate_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.config.url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        if response.status() == 401 {
            return Err(ProviderError::AuthError("Invalid API key".to_string()));
        }

        if !response.status().is_success() {
            return Err(ProviderError::ConnectionError(format!(
                "Failed to connect to OpenAI: HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedProvider;

    #[tokio::test]
    async fn test_ensure_available_reports_offline_provider() {
        assert!(ensure_available(&ScriptedProvider::echo()).await.is_ok());

        let offline = ScriptedProvider::offline();
        assert!(matches!(
            ensure_available(&offline).await,
            Err(ProviderError::ConnectionError(_))
        ));
        assert!(offline.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_token_limit_prefers_new_tokens() {
        let options = GenerationOptions {
            max_new_tokens: Some(200),
            max_length: Some(80),
            ..Default::default()
        };
        assert_eq!(options.token_limit(), Some(200));

        let options = GenerationOptions {
            max_length: Some(31),
            ..Default::default()
        };
        assert_eq!(options.token_limit(), Some(31));
    }

    #[test]
    fn test_greedy_decoding_zeroes_temperature() {
        let greedy = GenerationOptions {
            num_beams: Some(4),
            do_sample: false,
            temperature: Some(0.9),
            ..Default::default()
        };
        assert_eq!(greedy.effective_temperature(0.5), 0.0);

        let sampled = GenerationOptions {
            do_sample: true,
            temperature: Some(0.7),
            ..Default::default()
        };
        assert!((sampled.effective_temperature(0.5) - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ollama_options_mapping() {
        let provider = OllamaProvider::new(ModelConfig::default());
        let options = GenerationOptions {
            max_new_tokens: Some(200),
            do_sample: true,
            temperature: Some(0.7),
            repetition_penalty: Some(1.2),
            ..Default::default()
        };
        let json = serde_json::to_value(provider.options_for(&options)).unwrap();
        assert_eq!(json["num_predict"], 200);
        assert!((json["repeat_penalty"].as_f64().unwrap() - 1.2).abs() < 1e-6);
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_openai_requires_key() {
        let config = ModelConfig {
            provider: ProviderType::OpenAI,
            api_key: None,
            ..Default::default()
        };
        assert!(matches!(
            OpenAIProvider::new(config),
            Err(ProviderError::AuthError(_))
        ));
    }

    #[test]
    fn test_openai_penalty_mapping() {
        let config = ModelConfig {
            provider: ProviderType::OpenAI,
            api_key: Some("sk-test".to_string()),
            url: "https://api.openai.com/v1".to_string(),
            ..Default::default()
        };
        let provider = OpenAIProvider::new(config).unwrap();
        let request = provider.request_for(
            "hi",
            &GenerationOptions {
                repetition_penalty: Some(1.2),
                max_new_tokens: Some(50),
                ..Default::default()
            },
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 50);
        assert!((json["frequency_penalty"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(json["temperature"], 0.0);
    }
}
