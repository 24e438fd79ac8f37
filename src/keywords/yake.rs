//! YAKE-style unsupervised keyword scoring.
//!
//! Single-document statistics only: each term gets a weight from its casing,
//! position, frequency, context diversity and sentence spread; candidate
//! n-grams combine the weights of their words. Lower scores are better.

use super::{stopwords, KeywordError, KeywordScorer, ScoredPhrase, ScoringParams};
use crate::summary::text::split_sentences;
use std::collections::{HashMap, HashSet};

/// Terms within this distance count as context neighbours
const WINDOW_SIZE: usize = 1;

#[derive(Debug, Default)]
struct TermStats {
    tf: usize,
    tf_acronym: usize,
    tf_capitalized: usize,
    sentence_ids: Vec<usize>,
    left: HashMap<String, usize>,
    right: HashMap<String, usize>,
    is_stop: bool,
    is_numeric: bool,
}

#[derive(Debug)]
struct Token {
    raw: String,
    key: String,
}

#[derive(Debug)]
struct Candidate {
    surface: String,
    terms: Vec<String>,
    tf: usize,
}

/// Keyword scorer in the YAKE family
#[derive(Debug, Default, Clone)]
pub struct YakeScorer;

impl YakeScorer {
    pub fn new() -> Self {
        Self
    }
}

impl KeywordScorer for YakeScorer {
    fn score(&self, text: &str, params: &ScoringParams) -> Result<Vec<ScoredPhrase>, KeywordError> {
        let stop = stopwords::for_language(&params.language)
            .ok_or_else(|| KeywordError::UnsupportedLanguage(params.language.clone()))?;

        let sentences = segment(text);
        if sentences.is_empty() || params.ngram_max == 0 || params.candidate_count == 0 {
            return Ok(Vec::new());
        }

        let terms = collect_term_stats(&sentences, stop);
        let weights = term_weights(&terms, sentences.len());
        let (candidates, order) = collect_candidates(&sentences, &terms, params.ngram_max);

        let mut scored: Vec<(String, f64, usize)> = order
            .iter()
            .enumerate()
            .filter_map(|(rank, key)| {
                let candidate = candidates.get(key)?;
                Some((key.clone(), candidate_score(candidate, &terms, &weights), rank))
            })
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)));

        let mut accepted: Vec<(String, ScoredPhrase)> = Vec::new();
        for (key, score, _) in scored {
            if accepted.len() >= params.candidate_count {
                break;
            }
            let duplicate = params.dedup_limit < 1.0
                && accepted
                    .iter()
                    .any(|(seen, _)| levenshtein_ratio(seen, &key) > params.dedup_limit);
            if duplicate {
                continue;
            }
            if let Some(candidate) = candidates.get(&key) {
                accepted.push((
                    key,
                    ScoredPhrase {
                        phrase: candidate.surface.clone(),
                        score,
                    },
                ));
            }
        }

        Ok(accepted.into_iter().map(|(_, phrase)| phrase).collect())
    }
}

/// Sentences → punctuation-delimited chunks → word tokens
fn segment(text: &str) -> Vec<Vec<Vec<Token>>> {
    split_sentences(text)
        .iter()
        .map(|sentence| {
            let mut chunks = Vec::new();
            let mut current = Vec::new();
            let mut word = String::new();

            let flush_word = |word: &mut String, current: &mut Vec<Token>| {
                let trimmed = word.trim_matches(|c: char| c == '\'' || c == '-');
                if !trimmed.is_empty() {
                    current.push(Token {
                        raw: trimmed.to_string(),
                        key: trimmed.to_lowercase(),
                    });
                }
                word.clear();
            };

            for c in sentence.chars() {
                if c.is_alphanumeric() || c == '\'' || c == '-' {
                    word.push(c);
                } else if c.is_whitespace() {
                    flush_word(&mut word, &mut current);
                } else {
                    flush_word(&mut word, &mut current);
                    if !current.is_empty() {
                        chunks.push(std::mem::take(&mut current));
                    }
                }
            }
            flush_word(&mut word, &mut current);
            if !current.is_empty() {
                chunks.push(current);
            }
            chunks
        })
        .filter(|chunks: &Vec<Vec<Token>>| !chunks.is_empty())
        .collect()
}

fn is_numeric(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

fn is_acronym(raw: &str) -> bool {
    raw.chars().count() > 1
        && raw.chars().all(|c| c.is_alphabetic() || c.is_ascii_digit())
        && raw.chars().any(|c| c.is_alphabetic())
        && raw.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase())
}

fn collect_term_stats(
    sentences: &[Vec<Vec<Token>>],
    stop: &HashSet<&'static str>,
) -> HashMap<String, TermStats> {
    let mut terms: HashMap<String, TermStats> = HashMap::new();

    for (sentence_id, chunks) in sentences.iter().enumerate() {
        let mut position_in_sentence = 0;
        for chunk in chunks {
            for (i, token) in chunk.iter().enumerate() {
                let stats = terms.entry(token.key.clone()).or_default();
                stats.tf += 1;
                stats.sentence_ids.push(sentence_id);
                stats.is_numeric = is_numeric(&token.key);
                stats.is_stop = stop.contains(token.key.as_str()) || token.key.chars().count() < 3;

                if is_acronym(&token.raw) {
                    stats.tf_acronym += 1;
                } else if position_in_sentence > 0
                    && token.raw.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
                {
                    stats.tf_capitalized += 1;
                }
                position_in_sentence += 1;

                let from = i.saturating_sub(WINDOW_SIZE);
                for neighbour in &chunk[from..i] {
                    *stats.left.entry(neighbour.key.clone()).or_default() += 1;
                }
                let to = (i + 1 + WINDOW_SIZE).min(chunk.len());
                for neighbour in &chunk[i + 1..to] {
                    *stats.right.entry(neighbour.key.clone()).or_default() += 1;
                }
            }
        }
    }

    terms
}

fn term_weights(terms: &HashMap<String, TermStats>, sentence_count: usize) -> HashMap<String, f64> {
    let valid_tfs: Vec<f64> = terms
        .values()
        .filter(|t| !t.is_stop && !t.is_numeric)
        .map(|t| t.tf as f64)
        .collect();
    let mean = if valid_tfs.is_empty() {
        0.0
    } else {
        valid_tfs.iter().sum::<f64>() / valid_tfs.len() as f64
    };
    let std = if valid_tfs.is_empty() {
        0.0
    } else {
        (valid_tfs.iter().map(|tf| (tf - mean).powi(2)).sum::<f64>() / valid_tfs.len() as f64).sqrt()
    };
    let max_tf = terms.values().map(|t| t.tf).max().unwrap_or(1) as f64;
    let freq_norm = if mean + std > 0.0 { mean + std } else { 1.0 };

    terms
        .iter()
        .map(|(key, t)| {
            let tf = t.tf as f64;
            let t_case = t.tf_acronym.max(t.tf_capitalized) as f64 / (1.0 + tf.ln());
            let t_pos = (3.0 + median(&t.sentence_ids)).ln().ln();
            let t_freq = tf / freq_norm;
            let wl = context_diversity(&t.left);
            let wr = context_diversity(&t.right);
            let t_rel = 1.0 + (wl + wr) * (tf / max_tf);
            let spread: HashSet<usize> = t.sentence_ids.iter().copied().collect();
            let t_diff = spread.len() as f64 / sentence_count as f64;

            let h = (t_rel * t_pos) / (t_case + t_freq / t_rel + t_diff / t_rel);
            (key.clone(), h)
        })
        .collect()
}

fn context_diversity(context: &HashMap<String, usize>) -> f64 {
    let total: usize = context.values().sum();
    if total == 0 {
        0.0
    } else {
        context.len() as f64 / total as f64
    }
}

fn median(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// Candidates keyed by lowercase phrase, plus keys in first-seen order
fn collect_candidates(
    sentences: &[Vec<Vec<Token>>],
    terms: &HashMap<String, TermStats>,
    ngram_max: usize,
) -> (HashMap<String, Candidate>, Vec<String>) {
    let mut candidates: HashMap<String, Candidate> = HashMap::new();
    let mut order = Vec::new();

    for chunk in sentences.iter().flatten() {
        for start in 0..chunk.len() {
            for n in 1..=ngram_max {
                let end = start + n;
                if end > chunk.len() {
                    break;
                }
                let window = &chunk[start..end];
                let stats = |t: &Token| terms.get(&t.key);

                let edge_stop = [&window[0], &window[n - 1]]
                    .into_iter()
                    .any(|t| stats(t).map(|s| s.is_stop).unwrap_or(true));
                let has_numeric = window.iter().any(|t| stats(t).map(|s| s.is_numeric).unwrap_or(true));
                if edge_stop || has_numeric {
                    continue;
                }

                let key = window.iter().map(|t| t.key.as_str()).collect::<Vec<_>>().join(" ");
                match candidates.get_mut(&key) {
                    Some(candidate) => candidate.tf += 1,
                    None => {
                        order.push(key.clone());
                        candidates.insert(
                            key,
                            Candidate {
                                surface: window.iter().map(|t| t.raw.as_str()).collect::<Vec<_>>().join(" "),
                                terms: window.iter().map(|t| t.key.clone()).collect(),
                                tf: 1,
                            },
                        );
                    }
                }
            }
        }
    }

    (candidates, order)
}

fn candidate_score(
    candidate: &Candidate,
    terms: &HashMap<String, TermStats>,
    weights: &HashMap<String, f64>,
) -> f64 {
    let mut product = 1.0;
    let mut sum = 0.0;

    for (i, key) in candidate.terms.iter().enumerate() {
        let Some(stats) = terms.get(key) else {
            continue;
        };
        if !stats.is_stop {
            let h = weights.get(key).copied().unwrap_or(1.0);
            product *= h;
            sum += h;
            continue;
        }

        // Inner stopword: weigh by how strongly it binds its neighbours
        let (Some(prev), Some(next)) = (
            i.checked_sub(1).and_then(|j| candidate.terms.get(j)),
            candidate.terms.get(i + 1),
        ) else {
            continue;
        };
        let prob_prev = terms
            .get(prev)
            .map(|p| *p.right.get(key).unwrap_or(&0) as f64 / p.tf.max(1) as f64)
            .unwrap_or(0.0);
        let prob_next = terms
            .get(next)
            .map(|n| *n.left.get(key).unwrap_or(&0) as f64 / n.tf.max(1) as f64)
            .unwrap_or(0.0);
        let prob = prob_prev * prob_next;
        product *= 1.0 + (1.0 - prob);
        sum -= 1.0 - prob;
    }

    let denominator = candidate.tf as f64 * (1.0 + sum);
    if denominator <= 0.0 {
        return f64::MAX;
    }
    product / denominator
}

/// 1 - edit distance / longer length, over characters
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    1.0 - prev[b.len()] as f64 / longest as f64
}
