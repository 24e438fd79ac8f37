//! Keyword extraction
//!
//! A [`KeywordScorer`] proposes scored phrases (lower score = more salient);
//! [`KeywordExtractor`] over-fetches, orders, dedups case-insensitively and
//! truncates.

pub mod stopwords;
pub mod yake;

use std::collections::HashSet;
use thiserror::Error;

pub use yake::YakeScorer;

#[derive(Debug, Error)]
pub enum KeywordError {
    #[error("Unsupported keyword language: {0}")]
    UnsupportedLanguage(String),

    #[error("Keyword scoring failed: {0}")]
    ScoringFailed(String),
}

/// A candidate phrase and its score; lower is more relevant
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPhrase {
    pub phrase: String,
    pub score: f64,
}

/// Parameters handed to the scorer
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringParams {
    pub language: String,
    /// Longest candidate n-gram
    pub ngram_max: usize,
    /// Similarity above which a candidate is considered a duplicate
    pub dedup_limit: f64,
    /// How many candidates to return
    pub candidate_count: usize,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            ngram_max: 2,
            dedup_limit: 0.8,
            candidate_count: 45,
        }
    }
}

/// Statistical keyword scoring backend
pub trait KeywordScorer: Send + Sync {
    fn score(&self, text: &str, params: &ScoringParams) -> Result<Vec<ScoredPhrase>, KeywordError>;
}

pub struct KeywordExtractor {
    scorer: Box<dyn KeywordScorer>,
    top_k: usize,
    params: ScoringParams,
}

impl KeywordExtractor {
    /// Extractor returning up to `top_k` keywords; the scorer is asked for
    /// three times as many to survive deduplication.
    pub fn new(scorer: Box<dyn KeywordScorer>, top_k: usize) -> Self {
        let params = ScoringParams {
            candidate_count: top_k * 3,
            ..Default::default()
        };
        Self {
            scorer,
            top_k,
            params,
        }
    }

    pub fn with_params(mut self, language: &str, ngram_max: usize, dedup_limit: f64) -> Self {
        self.params.language = language.to_string();
        self.params.ngram_max = ngram_max;
        self.params.dedup_limit = dedup_limit;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn extract_keywords(&self, text: &str) -> Result<Vec<String>, KeywordError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates = self.scorer.score(text, &self.params)?;
        candidates.sort_by(|a, b| a.score.total_cmp(&b.score));

        let mut seen = HashSet::new();
        let mut keywords = Vec::with_capacity(self.top_k);
        for candidate in candidates {
            if keywords.len() >= self.top_k {
                break;
            }
            if seen.insert(candidate.phrase.to_lowercase()) {
                keywords.push(candidate.phrase);
            }
        }

        tracing::debug!("Extracted {} keywords", keywords.len());
        Ok(keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct FixedScorer {
        phrases: Vec<(&'static str, f64)>,
        seen_params: Arc<Mutex<Option<ScoringParams>>>,
    }

    impl KeywordScorer for FixedScorer {
        fn score(&self, _text: &str, params: &ScoringParams) -> Result<Vec<ScoredPhrase>, KeywordError> {
            *self.seen_params.lock().unwrap() = Some(params.clone());
            Ok(self
                .phrases
                .iter()
                .map(|(p, s)| ScoredPhrase {
                    phrase: p.to_string(),
                    score: *s,
                })
                .collect())
        }
    }

    struct FailingScorer;

    impl KeywordScorer for FailingScorer {
        fn score(&self, _text: &str, _params: &ScoringParams) -> Result<Vec<ScoredPhrase>, KeywordError> {
            Err(KeywordError::ScoringFailed("boom".to_string()))
        }
    }

    fn extractor(phrases: Vec<(&'static str, f64)>, top_k: usize) -> (KeywordExtractor, Arc<Mutex<Option<ScoringParams>>>) {
        let seen = Arc::new(Mutex::new(None));
        let scorer = FixedScorer {
            phrases,
            seen_params: seen.clone(),
        };
        (KeywordExtractor::new(Box::new(scorer), top_k), seen)
    }

    #[test]
    fn test_blank_input_returns_empty() {
        let (ex, seen) = extractor(vec![("rust", 0.1)], 5);
        assert!(ex.extract_keywords("   \n\t").unwrap().is_empty());
        assert!(seen.lock().unwrap().is_none());
    }

    #[test]
    fn test_overfetch_sort_dedup_truncate() {
        let (ex, seen) = extractor(
            vec![
                ("Borrow Checker", 0.30),
                ("rust", 0.05),
                ("borrow checker", 0.10),
                ("Rust", 0.20),
                ("lifetimes", 0.40),
                ("traits", 0.50),
            ],
            3,
        );

        let keywords = ex.extract_keywords("some text").unwrap();
        assert_eq!(keywords, vec!["rust", "borrow checker", "lifetimes"]);
        assert_eq!(seen.lock().unwrap().as_ref().unwrap().candidate_count, 9);
    }

    #[test]
    fn test_scorer_errors_propagate() {
        let ex = KeywordExtractor::new(Box::new(FailingScorer), 5);
        assert!(matches!(
            ex.extract_keywords("text"),
            Err(KeywordError::ScoringFailed(_))
        ));
    }

    #[test]
    fn test_yake_backed_extraction_is_unique_and_bounded() {
        let ex = KeywordExtractor::new(Box::new(YakeScorer::new()), 5);
        let text = "Rust is a systems programming language. Rust guarantees memory safety. \
                    The borrow checker enforces memory safety at compile time. \
                    Systems programming in Rust avoids garbage collection.";
        let keywords = ex.extract_keywords(text).unwrap();
        assert!(!keywords.is_empty());
        assert!(keywords.len() <= 5);

        let lowered: HashSet<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        assert_eq!(lowered.len(), keywords.len());
    }
}
