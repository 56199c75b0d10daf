use lazy_static::lazy_static;
use regex::Regex;

/// Default maximum chunk length in characters. Chunks are the unit of
/// speech synthesis, so this bounds both API payloads and how long a
/// stop/skip takes to become audible.
pub const DEFAULT_CHUNK_CHARS: usize = 500;

lazy_static! {
    // A sentence ends at `.`, `!` or `?` followed by whitespace. The scan
    // keeps the punctuation with the preceding sentence.
    static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"[.!?]\s+").unwrap();
}

/// Splits text into sentences at `.`/`!`/`?` + whitespace boundaries.
/// The terminating punctuation stays attached to its sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for m in SENTENCE_BOUNDARY.find_iter(text) {
        // The boundary punctuation is a single ASCII char at m.start().
        sentences.push(text[last..m.start() + 1].trim());
        last = m.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences.retain(|s| !s.is_empty());
    sentences
}

/// Greedily packs sentences into chunks of at most `max_chars` characters.
///
/// A single sentence longer than `max_chars` is never split mid-sentence;
/// it becomes its own oversized chunk. Empty input yields no chunks, and
/// no chunk is ever empty.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();
        if current_chars + sentence_chars > max_chars && !current.is_empty() {
            chunks.push(current);
            current = sentence.to_string();
            current_chars = sentence_chars;
        } else {
            if !current.is_empty() {
                current.push(' ');
                current_chars += 1;
            }
            current.push_str(sentence);
            current_chars += sentence_chars;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// `split_into_chunks` with the default bound.
pub fn split_default(text: &str) -> Vec<String> {
    split_into_chunks(text, DEFAULT_CHUNK_CHARS)
}
