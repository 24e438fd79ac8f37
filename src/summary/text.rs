//! Sentence-level text handling for the summarizer.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r"http\S+|www\S+").expect("valid regex");
    static ref DISALLOWED_RE: Regex =
        Regex::new(r#"[^A-Za-z0-9.,;:'"()\-\s]"#).expect("valid regex");
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref QUIZ_PREFIX_RE: Regex = Regex::new(
        r"(?i)^[^A-Za-z]*?(?:true|false|paraphrase|question|alse|rue|araphrase)\b[:\-]?\s*"
    )
    .expect("valid regex");
    static ref BOILERPLATE_RE: Regex =
        Regex::new(r"^(?:instead of following|in this approach we teach|false)")
            .expect("valid regex");
}

/// Sentences shorter than this many words are dropped
pub const MIN_SENTENCE_WORDS: usize = 6;

const INSTRUCTION_PREFIXES: &[&str] = &["choose", "tick", "mark", "select", "what is"];

/// Tokens that end with a period without ending a sentence
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "fig", "no",
    "inc", "ltd", "co", "corp", "dept", "approx", "al", "cf", "vol", "pp",
];

/// Strip URLs, replace everything outside letters, digits, whitespace and
/// `.,;:'"()-` with a space, then collapse whitespace.
pub fn clean_summary_text(text: &str) -> String {
    let text = URL_RE.replace_all(text, "");
    let text = DISALLOWED_RE.replace_all(&text, " ");
    collapse_whitespace(&text)
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split prose into sentences.
///
/// A `.`, `!` or `?` (plus any closing quotes or brackets) ends a sentence
/// when followed by whitespace, unless the word before the period is a known
/// abbreviation or a single-letter initial. The case of the next word does
/// not matter.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (_, c) = chars[i];
        if !matches!(c, '.' | '!' | '?') {
            i += 1;
            continue;
        }

        // Absorb runs like "?!" or "..." and trailing closers
        let mut end = i + 1;
        while end < chars.len() && matches!(chars[end].1, '.' | '!' | '?' | '"' | '\'' | ')' | ']') {
            end += 1;
        }

        let at_end = end >= chars.len();
        let followed_by_space = !at_end && chars[end].1.is_whitespace();
        if !at_end && !followed_by_space {
            i = end;
            continue;
        }

        if !at_end && c == '.' && ends_with_abbreviation(&text[start..chars[i].0]) {
            i = end;
            continue;
        }

        let byte_end = if at_end { text.len() } else { chars[end].0 };
        let sentence = text[start..byte_end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = byte_end;
        i = end;
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

fn ends_with_abbreviation(before_period: &str) -> bool {
    let word = before_period
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_lowercase();

    if word.chars().count() == 1 && word.chars().all(|c| c.is_alphabetic()) {
        return true;
    }
    ABBREVIATIONS.contains(&word.as_str())
}

/// Split after sentence punctuation followed by whitespace, without any
/// abbreviation handling. Used on generated text where the model decides
/// sentence ends.
pub fn split_on_terminal_whitespace(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            parts.push(&text[start..i]);
            let mut next = i + c.len_utf8();
            while let Some(&(j, ws)) = iter.peek() {
                if !ws.is_whitespace() {
                    break;
                }
                next = j + ws.len_utf8();
                iter.next();
            }
            start = next;
            prev = None;
            continue;
        }
        prev = Some(c);
    }

    parts.push(&text[start..]);
    parts
}

/// Remove leading quiz markers such as "True:" or "question-"
pub fn strip_quiz_prefix(sentence: &str) -> String {
    QUIZ_PREFIX_RE.replace(sentence, "").into_owned()
}

/// Questions and quiz instructions are not summary material
pub fn is_instruction(sentence: &str) -> bool {
    if sentence.contains('?') {
        return true;
    }
    let lower = sentence.to_lowercase();
    INSTRUCTION_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Sentence split, quiz-marker stripping, and length/instruction filtering
pub fn filter_sentences(text: &str) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .filter_map(|s| {
            let s = strip_quiz_prefix(s.trim());
            if s.is_empty() || word_count(&s) < MIN_SENTENCE_WORDS || is_instruction(&s) {
                None
            } else {
                Some(s)
            }
        })
        .collect()
}

/// Greedily pack sentences into paragraphs, closing one as soon as it
/// exceeds `word_limit` words. Paragraphs are separated by a blank line.
pub fn merge_into_paragraphs(sentences: &[String], word_limit: usize) -> String {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_words = 0;

    for sentence in sentences {
        current.push(sentence);
        current_words += word_count(sentence);
        if current_words > word_limit {
            paragraphs.push(current.join(" "));
            current.clear();
            current_words = 0;
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}

/// Drop repeated sentences (case and whitespace insensitive) and known
/// boilerplate lead-ins, joining the rest with single spaces.
pub fn deduplicate_summary(text: &str) -> String {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for sentence in split_on_terminal_whitespace(text) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        let key = WHITESPACE_RE.replace_all(&sentence.to_lowercase(), " ").into_owned();
        if !seen.insert(key.clone()) {
            continue;
        }
        if BOILERPLATE_RE.is_match(&key) {
            continue;
        }

        kept.push(sentence);
    }

    kept.join(" ")
}
