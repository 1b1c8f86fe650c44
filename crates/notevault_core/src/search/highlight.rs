//! Highlight rendering and result navigation over the live editor surface.
//!
//! # Responsibility
//! - Wrap query occurrences in the live markup with highlight markers.
//! - Keep a pre-search snapshot and restore it exactly when search ends.
//! - Track the active result and drive keyboard-style navigation.
//!
//! # Invariants
//! - Every search first restores the snapshot, so markers never compound.
//! - Clearing restores the snapshot bit-identically and drops it.
//! - Markers are inserted into text segments only, never into tags.
//! - A marker never splits a character reference.
//! - Persisted content never carries markers (see [`strip_highlight_markers`]).

use crate::search::extract::extract_text;
use crate::search::markup::{entity_spans, escape_text, tokenize, Token};
use crate::search::matcher::{find_matches, literal_pattern, MatchOptions, SearchMatch};
use crate::search::surface::EditorSurface;
use crate::search::{SearchError, SearchResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

pub const HIGHLIGHT_OPEN: &str = r#"<mark class="highlight">"#;
pub const HIGHLIGHT_CLOSE: &str = "</mark>";

static HIGHLIGHT_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<mark class="highlight">([^<]*)</mark>"#).expect("valid marker regex")
});

/// Wraps every literal occurrence of `query` in the text segments of
/// `markup`. Tags, attribute values and raw-text bodies are left untouched.
pub fn highlight_markup(markup: &str, query: &str, options: MatchOptions) -> String {
    let Some(pattern) = literal_pattern(&escape_text(query), options) else {
        return markup.to_string();
    };

    let mut rendered = String::with_capacity(markup.len());
    for token in tokenize(markup) {
        let span = token.span();
        let segment = &markup[span];
        match token {
            Token::Text {
                raw_text: false, ..
            } => wrap_matches(&mut rendered, segment, &pattern),
            _ => rendered.push_str(segment),
        }
    }
    rendered
}

/// Appends `segment` with every hit of `pattern` wrapped in a marker. Hits
/// that cut through a character reference are left unwrapped.
fn wrap_matches(rendered: &mut String, segment: &str, pattern: &Regex) {
    let entities = entity_spans(segment);
    let mut cursor = 0;
    for hit in pattern.find_iter(segment) {
        if splits_entity(&hit.range(), &entities) {
            continue;
        }
        rendered.push_str(&segment[cursor..hit.start()]);
        rendered.push_str(HIGHLIGHT_OPEN);
        rendered.push_str(hit.as_str());
        rendered.push_str(HIGHLIGHT_CLOSE);
        cursor = hit.end();
    }
    rendered.push_str(&segment[cursor..]);
}

fn splits_entity(hit: &Range<usize>, entities: &[Range<usize>]) -> bool {
    entities.iter().any(|entity| {
        let overlaps = hit.start < entity.end && entity.start < hit.end;
        let contains = hit.start <= entity.start && entity.end <= hit.end;
        overlaps && !contains
    })
}

/// Removes highlight markers, keeping their text.
pub fn strip_highlight_markers(markup: &str) -> String {
    HIGHLIGHT_MARKER_RE.replace_all(markup, "$1").into_owned()
}

/// `No results`, `1 result` or `N results`.
pub fn results_summary(count: usize) -> String {
    match count {
        0 => "No results".to_string(),
        1 => "1 result".to_string(),
        count => format!("{count} results"),
    }
}

/// Direction for stepping through results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Keys the search box reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKey {
    ArrowUp,
    ArrowDown,
    Escape,
}

/// What a search run did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Empty query: no active search.
    Cleared,
    Results { count: usize },
}

/// Search session state for one editor surface.
#[derive(Debug, Default)]
pub struct HighlightController {
    options: MatchOptions,
    snapshot: Option<String>,
    results: Vec<SearchMatch>,
    active: Option<usize>,
}

impl HighlightController {
    pub fn new(options: MatchOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// Takes effect on the next [`HighlightController::run_search`].
    pub fn set_options(&mut self, options: MatchOptions) {
        self.options = options;
    }

    /// Runs a search for `query` against the surface.
    pub fn run_search(&mut self, surface: &mut dyn EditorSurface, query: &str) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            self.clear_search(surface);
            return SearchOutcome::Cleared;
        }

        let snapshot = self
            .snapshot
            .get_or_insert_with(|| surface.markup())
            .clone();
        let title = surface.title();
        let text = extract_text(Some(title.as_str()), &snapshot);
        self.results = find_matches(&text, query, self.options);
        self.active = if self.results.is_empty() { None } else { Some(0) };

        surface.set_markup(snapshot);
        let live = surface.markup();
        surface.set_markup(highlight_markup(&live, query, self.options));

        debug!(
            "event=search_run module=search status=ok query_len={} results={}",
            query.chars().count(),
            self.results.len()
        );
        SearchOutcome::Results {
            count: self.results.len(),
        }
    }

    /// Ends the search: restores the snapshot and drops all results.
    pub fn clear_search(&mut self, surface: &mut dyn EditorSurface) {
        self.results.clear();
        self.active = None;
        if let Some(snapshot) = self.snapshot.take() {
            surface.set_markup(snapshot);
        }
    }

    /// Steps the active result by one; clamps at both ends.
    pub fn navigate(&mut self, surface: &mut dyn EditorSurface, direction: Direction) -> Option<usize> {
        let current = self.active?;
        let next = match direction {
            Direction::Next if current + 1 < self.results.len() => current + 1,
            Direction::Previous if current > 0 => current - 1,
            _ => current,
        };
        self.active = Some(next);
        surface.reveal_match(next);
        Some(next)
    }

    /// Makes `index` the active result, e.g. from a result-list click.
    pub fn jump_to(&mut self, surface: &mut dyn EditorSurface, index: usize) -> SearchResult<()> {
        if index >= self.results.len() {
            return Err(SearchError::IndexOutOfRange {
                index,
                len: self.results.len(),
            });
        }
        self.active = Some(index);
        surface.reveal_match(index);
        Ok(())
    }

    /// Applies the search box key bindings.
    pub fn handle_key(&mut self, surface: &mut dyn EditorSurface, key: SearchKey) {
        match key {
            SearchKey::ArrowDown => {
                self.navigate(surface, Direction::Next);
            }
            SearchKey::ArrowUp => {
                self.navigate(surface, Direction::Previous);
            }
            SearchKey::Escape => self.clear_search(surface),
        }
    }

    pub fn is_active(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn results(&self) -> &[SearchMatch] {
        &self.results
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn can_go_previous(&self) -> bool {
        self.active.is_some_and(|index| index > 0)
    }

    pub fn can_go_next(&self) -> bool {
        self.active
            .is_some_and(|index| index + 1 < self.results.len())
    }

    /// Result-count label for the search panel.
    pub fn summary(&self) -> String {
        results_summary(self.results.len())
    }

    /// Markup safe to persist: the live surface content without markers.
    ///
    /// While a search is active the snapshot is refreshed too, so clearing
    /// keeps edits made on the highlighted surface.
    pub fn committed_markup(&mut self, surface: &dyn EditorSurface) -> String {
        let committed = strip_highlight_markers(&surface.markup());
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.clone_from(&committed);
        }
        committed
    }
}
