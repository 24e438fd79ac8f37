use crate::provider::{GenerationOptions, ModelProvider, ProviderError};
use crate::summary::text::word_count;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

lazy_static! {
    static ref ECHO_RE: Regex = Regex::new(r"(?i)paraphrase\s*:\s*").expect("valid regex");
}

/// Output length cap, in tokens
const MAX_PARAPHRASE_LENGTH: usize = 80;
/// Slack added to the input word count
const LENGTH_SLACK: usize = 25;
const NUM_BEAMS: usize = 4;

#[derive(Debug, Error)]
pub enum ParaphraseError {
    #[error("Paraphrase model failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Paraphrase model returned no text")]
    Empty,
}

/// Rewrites one sentence at a time through a generation model.
pub struct Paraphraser {
    provider: Arc<dyn ModelProvider>,
}

impl Paraphraser {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Decoding options for a sentence: beam search, no sampling, output
    /// bounded relative to the input length.
    pub fn options_for(sentence: &str) -> GenerationOptions {
        GenerationOptions {
            max_length: Some(MAX_PARAPHRASE_LENGTH.min(word_count(sentence) + LENGTH_SLACK)),
            num_beams: Some(NUM_BEAMS),
            do_sample: false,
            ..Default::default()
        }
    }

    /// Rewrite one sentence, removing any echoed `paraphrase:` marker.
    ///
    /// Output that is empty after cleanup is [`ParaphraseError::Empty`], so
    /// [`paraphrase_or_original`](Self::paraphrase_or_original) keeps the
    /// source sentence instead of dropping it.
    pub async fn paraphrase(&self, sentence: &str) -> Result<String, ParaphraseError> {
        let prompt = format!("paraphrase: {}", sentence);
        let response = self
            .provider
            .generate(&prompt, &Self::options_for(sentence))
            .await?;

        let cleaned = ECHO_RE.replace_all(&response.content, "").trim().to_string();
        if cleaned.is_empty() {
            return Err(ParaphraseError::Empty);
        }
        Ok(cleaned)
    }

    /// Paraphrase, keeping the original sentence if the model fails
    pub async fn paraphrase_or_original(&self, sentence: &str) -> String {
        match self.paraphrase(sentence).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Paraphrase failed, keeping original sentence: {}", e);
                sentence.to_string()
            }
        }
    }
}
