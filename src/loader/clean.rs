use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LINK_RE: Regex = Regex::new(r"http\S+|www\S+|@\S+").expect("valid regex");
    static ref NAVIGATION_RE: Regex = Regex::new(
        r"(?i)\b(share|photo|video|page|click|email|home|comment|subscribe|story|article|report)\b"
    )
    .expect("valid regex");
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Strip links, handles and site navigation words from extracted text,
/// then collapse whitespace.
pub fn clean_document_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = LINK_RE.replace_all(text, " ");
    let text = NAVIGATION_RE.replace_all(&text, " ");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}
