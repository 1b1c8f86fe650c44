//! Page and document-state model.
//!
//! # Responsibility
//! - Define the page list, active page pointer and settings bundle.
//! - Provide self-healing for the active page pointer and page ids.
//!
//! # Invariants
//! - Page ids are unique after [`DocumentState::heal`].
//! - When `pages` is non-empty, `active_page_id` references one of them
//!   after [`DocumentState::heal_active_page`].
//! - Page order is insertion order and doubles as display order.

use crate::model::settings::Settings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Opaque page identifier. Imported backups may carry any string shape.
pub type PageId = String;

/// Markup used for a freshly created, empty page body.
pub const EMPTY_PAGE_CONTENT: &str = "<p><br></p>";
/// Title given to the page created on first run.
pub const FIRST_PAGE_TITLE: &str = "Untitled Page";
/// Title given to pages created from the page list.
pub const NEW_PAGE_TITLE: &str = "Untitled";

/// One rich-text page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    /// Serialized rich-content markup owned by this page only.
    pub content: String,
}

impl Page {
    /// Creates an empty page with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, EMPTY_PAGE_CONTENT)
    }

    /// Creates a page with a caller-provided id.
    pub fn with_id(
        id: impl Into<PageId>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Full persisted document: pages, active pointer and settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    pub pages: Vec<Page>,
    #[serde(default)]
    pub active_page_id: Option<PageId>,
    #[serde(default)]
    pub settings: Settings,
}

impl DocumentState {
    /// First-run state: one untitled page, active, with default settings.
    pub fn initial() -> Self {
        let page = Page::new(FIRST_PAGE_TITLE);
        Self {
            active_page_id: Some(page.id.clone()),
            pages: vec![page],
            settings: Settings::default(),
        }
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == id)
    }

    pub fn page_mut(&mut self, id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|page| page.id == id)
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.active_page_id
            .as_deref()
            .and_then(|id| self.page(id))
    }

    /// Makes page ids unique, then repairs the active pointer. Returns
    /// whether anything changed.
    pub fn heal(&mut self) -> bool {
        let reassigned = self.reassign_duplicate_ids();
        let repointed = self.heal_active_page();
        reassigned || repointed
    }

    /// Gives every repeated page id after its first occurrence a fresh id.
    /// The active pointer keeps resolving to the first occurrence.
    pub fn reassign_duplicate_ids(&mut self) -> bool {
        let mut seen = HashSet::with_capacity(self.pages.len());
        let mut changed = false;
        for page in &mut self.pages {
            if !seen.insert(page.id.clone()) {
                page.id = Uuid::new_v4().to_string();
                seen.insert(page.id.clone());
                changed = true;
            }
        }
        changed
    }

    /// Repairs a dangling or missing active pointer.
    ///
    /// Selects the first page when the pointer does not resolve, or clears it
    /// when there are no pages. Returns whether anything changed.
    pub fn heal_active_page(&mut self) -> bool {
        if self.active_page().is_some() {
            return false;
        }

        let healed = self.pages.first().map(|page| page.id.clone());
        if healed == self.active_page_id {
            return false;
        }
        self.active_page_id = healed;
        true
    }
}
