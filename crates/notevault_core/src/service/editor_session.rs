//! Editing session: one document store driving one editor surface.
//!
//! # Responsibility
//! - Load the active page into the surface and commit edits back.
//! - Run search against the surface with the options from settings.
//! - End any running search before the surface switches pages.
//!
//! # Invariants
//! - Committed content never carries highlight markers.
//! - The surface shows the active page, or the empty placeholder when the
//!   document has no pages.

use crate::model::document::PageId;
use crate::model::settings::Settings;
use crate::prompt::{PendingInput, PromptBroker, PromptError, PromptKind};
use crate::repo::kv_repo::KvRepository;
use crate::search::highlight::{Direction, HighlightController, SearchKey, SearchOutcome};
use crate::search::matcher::MatchOptions;
use crate::search::surface::EditorSurface;
use crate::search::SearchResult;
use crate::service::document_store::{DocumentStore, StoreResult};

/// Title shown when the document has no pages.
pub const NO_PAGES_TITLE: &str = "No Pages";

fn match_options(settings: &Settings) -> MatchOptions {
    MatchOptions {
        case_sensitive: settings.search_case_sensitive,
        whole_words: settings.search_whole_words,
    }
}

pub struct EditorSession<R: KvRepository, S: EditorSurface> {
    store: DocumentStore<R>,
    surface: S,
    search: HighlightController,
    prompts: PromptBroker,
}

impl<R: KvRepository, S: EditorSurface> EditorSession<R, S> {
    /// Binds `store` to `surface` and shows the active page.
    pub fn open(store: DocumentStore<R>, surface: S) -> Self {
        let search = HighlightController::new(match_options(store.settings()));
        let mut session = Self {
            store,
            surface,
            search,
            prompts: PromptBroker::new(),
        };
        session.show_active_page();
        session
    }

    pub fn store(&self) -> &DocumentStore<R> {
        &self.store
    }

    /// Mutable store access for flows that replace the whole document.
    /// Call [`EditorSession::reload`] afterwards.
    pub fn store_mut(&mut self) -> &mut DocumentStore<R> {
        &mut self.store
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn search(&self) -> &HighlightController {
        &self.search
    }

    pub fn prompts_mut(&mut self) -> &mut PromptBroker {
        &mut self.prompts
    }

    /// Ends any search and shows the active page again.
    pub fn reload(&mut self) {
        self.search.clear_search(&mut self.surface);
        self.search.set_options(match_options(self.store.settings()));
        self.show_active_page();
    }

    pub fn create_page(&mut self) -> StoreResult<PageId> {
        self.search.clear_search(&mut self.surface);
        let id = self.store.create_page()?;
        self.show_active_page();
        Ok(id)
    }

    pub fn select_page(&mut self, id: &str) -> StoreResult<()> {
        self.search.clear_search(&mut self.surface);
        self.store.select_page(id)?;
        self.show_active_page();
        Ok(())
    }

    pub fn delete_page(&mut self, id: &str) -> StoreResult<()> {
        self.search.clear_search(&mut self.surface);
        self.store.delete_page(id)?;
        self.show_active_page();
        Ok(())
    }

    /// Persists the surface title and content into the active page.
    /// No-op without an active page.
    pub fn commit_edits(&mut self) -> StoreResult<()> {
        let Some(id) = self.store.active_page().map(|page| page.id.clone()) else {
            return Ok(());
        };
        let title = self.surface.title();
        let markup = self.search.committed_markup(&self.surface);
        self.store.rename_page(&id, title.trim())?;
        self.store.update_page_content(&id, &markup)
    }

    pub fn update_settings(&mut self, update: impl FnOnce(&mut Settings)) -> StoreResult<()> {
        self.store.update_settings(update)?;
        self.search.set_options(match_options(self.store.settings()));
        Ok(())
    }

    pub fn reset_settings(&mut self) -> StoreResult<()> {
        self.store.reset_settings()?;
        self.search.set_options(match_options(self.store.settings()));
        Ok(())
    }

    pub fn run_search(&mut self, query: &str) -> SearchOutcome {
        self.search.run_search(&mut self.surface, query)
    }

    pub fn clear_search(&mut self) {
        self.search.clear_search(&mut self.surface);
    }

    pub fn navigate(&mut self, direction: Direction) -> Option<usize> {
        self.search.navigate(&mut self.surface, direction)
    }

    pub fn jump_to(&mut self, index: usize) -> SearchResult<()> {
        self.search.jump_to(&mut self.surface, index)
    }

    pub fn handle_key(&mut self, key: SearchKey) {
        self.search.handle_key(&mut self.surface, key);
    }

    /// Opens a free-text request, e.g. a link or image URL.
    pub fn ask_for_input(&mut self, title: &str) -> Result<PendingInput, PromptError> {
        self.prompts.open(PromptKind::Text, title)
    }

    fn show_active_page(&mut self) {
        match self.store.active_page() {
            Some(page) => {
                self.surface.set_title(page.title.clone());
                self.surface.set_markup(page.content.clone());
            }
            None => {
                self.surface.set_title(NO_PAGES_TITLE.to_string());
                self.surface.set_markup(String::new());
            }
        }
    }
}
