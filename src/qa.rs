//! Grounded question answering over retrieved chunks.

use crate::provider::{GenerationOptions, ModelProvider, ProviderError};
use crate::search::RetrievalHit;
use std::sync::Arc;

/// How many retrieved chunks are fed to the model
pub const CONTEXT_CHUNKS: usize = 3;
pub const DEFAULT_MAX_SENTENCES: usize = 4;

const MAX_NEW_TOKENS: usize = 200;
const TEMPERATURE: f32 = 0.7;
const REPETITION_PENALTY: f32 = 1.2;
const ANSWER_PREFIX: &str = "answer:";

pub struct QaModule {
    provider: Arc<dyn ModelProvider>,
}

impl QaModule {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Fixed QA prompt over the first [`CONTEXT_CHUNKS`] hits.
    ///
    /// The requested length is "3 to `max_sentences + 1`" sentences, so
    /// [`DEFAULT_MAX_SENTENCES`] yields "3 to 5".
    pub fn build_prompt(question: &str, contexts: &[RetrievalHit], max_sentences: usize) -> String {
        let merged = contexts
            .iter()
            .take(CONTEXT_CHUNKS)
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "Answer the following question in 3 to {} full sentences based strictly on the provided document text.\n\n\
             Document text:\n{}\n\n\
             Question: {}\n\n\
             Answer:",
            max_sentences + 1,
            merged,
            question
        )
    }

    pub fn generation_options() -> GenerationOptions {
        GenerationOptions {
            max_new_tokens: Some(MAX_NEW_TOKENS),
            do_sample: true,
            temperature: Some(TEMPERATURE),
            repetition_penalty: Some(REPETITION_PENALTY),
            ..Default::default()
        }
    }

    /// Answer `question` from the first few `contexts`.
    ///
    /// No contexts still produces a prompt with an empty document section.
    pub async fn answer(
        &self,
        question: &str,
        contexts: &[RetrievalHit],
        max_sentences: usize,
    ) -> Result<String, ProviderError> {
        let prompt = Self::build_prompt(question, contexts, max_sentences);
        tracing::debug!(
            "QA prompt built from {} contexts ({} chars)",
            contexts.len().min(CONTEXT_CHUNKS),
            prompt.len()
        );

        let response = self.provider.generate(&prompt, &Self::generation_options()).await?;
        if response.finish_reason.as_deref() == Some("length") {
            tracing::debug!("Answer from {} stopped at the token limit", response.model);
        }
        Ok(strip_answer_prefix(&response.content))
    }
}

fn strip_answer_prefix(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.get(..ANSWER_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(ANSWER_PREFIX) => {
            trimmed[ANSWER_PREFIX.len()..].trim().to_string()
        }
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Reply, ScriptedProvider};

    fn hit(text: &str, position: usize) -> RetrievalHit {
        RetrievalHit {
            text: text.to_string(),
            score: 1.0 - position as f32 * 0.1,
            position,
        }
    }

    #[test]
    fn test_prompt_template() {
        let contexts = vec![hit("one", 0), hit("two", 1), hit("three", 2), hit("four", 3)];
        let prompt = QaModule::build_prompt("What is it?", &contexts, DEFAULT_MAX_SENTENCES);
        assert_eq!(
            prompt,
            "Answer the following question in 3 to 5 full sentences based strictly on the provided document text.\n\n\
             Document text:\none two three\n\n\
             Question: What is it?\n\n\
             Answer:"
        );
    }

    #[test]
    fn test_prompt_sentence_range_follows_max_sentences() {
        let prompt = QaModule::build_prompt("Why?", &[hit("ctx", 0)], 6);
        assert!(prompt.starts_with("Answer the following question in 3 to 7 full sentences"));
    }

    #[test]
    fn test_strip_answer_prefix() {
        assert_eq!(strip_answer_prefix("  ANSWER:  It is blue. "), "It is blue.");
        assert_eq!(strip_answer_prefix("It is blue."), "It is blue.");
        assert_eq!(strip_answer_prefix("The answer: blue"), "The answer: blue");
        assert_eq!(strip_answer_prefix("ans"), "ans");
    }

    #[tokio::test]
    async fn test_answer_uses_sampling_options() {
        let provider = Arc::new(ScriptedProvider::new(vec![Reply::Text(
            "Answer: Rust has no garbage collector.".to_string(),
        )]));
        let qa = QaModule::new(provider.clone());

        let answer = qa
            .answer("Does Rust use GC?", &[hit("Rust manages memory without GC.", 0)], 4)
            .await
            .unwrap();
        assert_eq!(answer, "Rust has no garbage collector.");

        let options = provider.options.lock().unwrap()[0].clone();
        assert_eq!(options.max_new_tokens, Some(200));
        assert_eq!(options.temperature, Some(0.7));
        assert_eq!(options.repetition_penalty, Some(1.2));
        assert!(options.do_sample);
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let qa = QaModule::new(Arc::new(ScriptedProvider::new(vec![Reply::Fail])));
        assert!(qa.answer("Why?", &[], 4).await.is_err());
    }
}
