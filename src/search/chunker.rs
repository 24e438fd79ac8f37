//! Fixed-window chunker for document retrieval.

/// Split `text` into contiguous, non-overlapping windows of `chunk_size`
/// characters. The last window may be shorter. Windows are cut on char
/// boundaries, never inside a code point.
pub fn chunk_fixed(text: &str, chunk_size: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(text.len() / chunk_size + 1);
    let mut start = 0;
    let mut count = 0;

    for (i, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(text[start..i].to_string());
            start = i;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    chunks
}
