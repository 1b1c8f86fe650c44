//! Literal substring matching with bounded context windows.
//!
//! # Responsibility
//! - Find every non-overlapping occurrence of a literal query, left to right.
//! - Describe each hit with a context window clipped to the text edges.
//!
//! # Invariants
//! - Queries are literal: pattern metacharacters are always escaped.
//! - Offsets count Unicode scalar values, not bytes.
//! - `context_end - context_start <= 2 * CONTEXT_RADIUS + match length`.

use log::warn;
use regex::{Regex, RegexBuilder};

/// Characters of context kept on each side of a match.
pub const CONTEXT_RADIUS: usize = 50;

/// Matching switches, usually taken from settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    /// Requires word boundaries at the query's word-character edges.
    pub whole_words: bool,
}

/// One occurrence of the query in extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Char offset of the match in the full text.
    pub absolute_index: usize,
    /// Text as it appears in the document (case may differ from the query).
    pub matched_text: String,
    pub context_window: String,
    pub context_start: usize,
    pub context_end: usize,
    /// Char offset of the match inside `context_window`.
    pub highlight_start_offset: usize,
    pub highlight_end_offset: usize,
}

impl SearchMatch {
    /// Splits the context window into before / match / after.
    pub fn segments(&self) -> (&str, &str, &str) {
        let start = byte_offset(&self.context_window, self.highlight_start_offset);
        let end = byte_offset(&self.context_window, self.highlight_end_offset);
        (
            &self.context_window[..start],
            &self.context_window[start..end],
            &self.context_window[end..],
        )
    }
}

fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(index, _)| index)
}

/// Compiles `needle` as a literal pattern honoring `options`.
///
/// Returns `None` for an empty needle or when the pattern exceeds the
/// compiler's size limits.
pub fn literal_pattern(needle: &str, options: MatchOptions) -> Option<Regex> {
    if needle.is_empty() {
        return None;
    }

    let mut pattern = regex::escape(needle);
    if options.whole_words {
        if needle.chars().next().is_some_and(is_word_char) {
            pattern.insert_str(0, r"\b");
        }
        if needle.chars().next_back().is_some_and(is_word_char) {
            pattern.push_str(r"\b");
        }
    }

    match RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!(
                "event=search_pattern module=search status=error query_len={} error={err}",
                needle.chars().count()
            );
            None
        }
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Finds all occurrences of `query` in `text`.
///
/// An empty query yields no matches; callers treat that as "no active
/// search" rather than "zero results".
pub fn find_matches(text: &str, query: &str, options: MatchOptions) -> Vec<SearchMatch> {
    let Some(regex) = literal_pattern(query, options) else {
        return Vec::new();
    };

    // boundaries[k] is the byte offset of char k; the last entry is text.len().
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;
    let char_at = |byte: usize| boundaries.partition_point(|&offset| offset < byte);

    regex
        .find_iter(text)
        .filter(|found| !found.is_empty())
        .map(|found| {
            let index = char_at(found.start());
            let length = char_at(found.end()) - index;
            let context_start = index.saturating_sub(CONTEXT_RADIUS);
            let context_end = (index + length + CONTEXT_RADIUS).min(total_chars);
            let highlight_start_offset = index - context_start;

            SearchMatch {
                absolute_index: index,
                matched_text: found.as_str().to_string(),
                context_window: text[boundaries[context_start]..boundaries[context_end]]
                    .to_string(),
                context_start,
                context_end,
                highlight_start_offset,
                highlight_end_offset: highlight_start_offset + length,
            }
        })
        .collect()
}
