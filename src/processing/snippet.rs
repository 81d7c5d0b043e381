//! Short description snippets for match payloads.

use std::sync::OnceLock;

use regex::Regex;

const SNIPPET_MAX_SENTENCES: usize = 2;

fn sentence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^.!?]+[.!?]*").expect("sentence pattern is valid"))
}

/// First `max_sentences` sentences of the text, whitespace collapsed.
fn first_sentences(text: &str, max_sentences: usize) -> String {
    let collapsed = collapse_whitespace(text);
    sentence_pattern()
        .find_iter(&collapsed)
        .take(max_sentences)
        .map(|m| m.as_str().trim())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters, cutting at a word boundary
/// and appending an ellipsis on overflow. Expects collapsed whitespace.
fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    let cut = match truncated.rfind(' ') {
        Some(position) if position > 0 => &truncated[..position],
        _ => truncated.as_str(),
    };
    format!("{cut}…")
}

/// Summarize a profile description for display: the first couple of
/// sentences, capped at `max_chars` without cutting mid-word.
pub fn summarize_description(text: &str, max_chars: usize) -> String {
    truncate_at_word(&first_sentences(text, SNIPPET_MAX_SENTENCES), max_chars)
}
