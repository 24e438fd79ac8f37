//! Deterministic collaborators for unit tests.

use crate::config::ModelProvider as ProviderType;
use crate::embedding::Embedder;
use crate::provider::{GenerationOptions, ModelProvider, ProviderError, ProviderResponse};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

const BAG_DIMENSION: usize = 64;

/// Hashed bag-of-words vector; texts sharing words point the same way.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; BAG_DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.to_lowercase().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % BAG_DIMENSION as u64) as usize] += 1.0;
    }
    vector
}

/// Embedder with fixed vectors for known texts and bag-of-words otherwise
#[derive(Default)]
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    pub calls: Mutex<usize>,
}

impl TableEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), vector);
        self
    }

    fn lookup(&self, text: &str) -> Vec<f32> {
        self.table
            .get(text)
            .cloned()
            .unwrap_or_else(|| bag_of_words(text))
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    async fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.lookup(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        *self.calls.lock().unwrap() += 1;
        Ok(texts.iter().map(|t| self.lookup(t)).collect())
    }
}

/// Embedder that always fails
pub struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    async fn embed_text(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("embedding backend offline")
    }

    async fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("embedding backend offline")
    }
}

/// Scripted reply for [`ScriptedProvider`]
pub enum Reply {
    Text(String),
    Fail,
    /// Return the prompt unchanged
    Echo,
}

/// Provider returning queued replies (then echoing) and recording calls
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    pub prompts: Mutex<Vec<String>>,
    pub options: Mutex<Vec<GenerationOptions>>,
    reachable: bool,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
            reachable: true,
        }
    }

    /// Fails `validate_connection`
    pub fn offline() -> Self {
        Self {
            reachable: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn echo() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<ProviderResponse, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.options.lock().unwrap().push(options.clone());

        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Echo);
        let content = match reply {
            Reply::Text(text) => text,
            Reply::Echo => prompt.to_string(),
            Reply::Fail => {
                return Err(ProviderError::ConnectionError("model offline".to_string()))
            }
        };

        Ok(ProviderResponse {
            content,
            model: "scripted".to_string(),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn validate_connection(&self) -> Result<(), ProviderError> {
        if self.reachable {
            Ok(())
        } else {
            Err(ProviderError::ConnectionError("model offline".to_string()))
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }
}
