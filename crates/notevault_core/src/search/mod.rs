//! In-document search: text extraction, literal matching and highlighting.
//!
//! # Responsibility
//! - Flatten page content into matchable text ([`extract`]).
//! - Find literal, non-overlapping occurrences with context ([`matcher`]).
//! - Render and clear highlights on the live surface ([`highlight`]).
//!
//! # Invariants
//! - Queries are literal text; metacharacters never act as patterns.
//! - Search never mutates persisted content.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod extract;
pub mod highlight;
pub mod markup;
pub mod matcher;
pub mod surface;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Requested result index is outside the current result list.
    IndexOutOfRange { index: usize, len: usize },
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "search result index {index} out of range ({len} results)")
            }
        }
    }
}

impl Error for SearchError {}
