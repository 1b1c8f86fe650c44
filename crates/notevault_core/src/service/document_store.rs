//! Document state owner and its persisted slot.
//!
//! # Responsibility
//! - Own the in-memory [`DocumentState`] for the process lifetime.
//! - Provide page CRUD and settings mutation with read-modify-persist
//!   semantics.
//!
//! # Invariants
//! - A mutation either persists and becomes visible, or leaves the in-memory
//!   state untouched.
//! - Page ids and the active page pointer are healed after every mutation and load.
//! - Highlight markers never reach the persisted slot.

use crate::model::document::{DocumentState, Page, PageId, NEW_PAGE_TITLE};
use crate::model::settings::Settings;
use crate::repo::kv_repo::{KvRepository, RepoError};
use crate::search::highlight::strip_highlight_markers;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted slot key for the document blob.
pub const DOCUMENT_SLOT_KEY: &str = "notevault.document";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Repo(RepoError),
    /// Document could not be serialized for persistence.
    Serialize(String),
    PageNotFound(PageId),
    /// `create_page` refused because `settings.max_pages` is reached.
    PageLimitReached { max_pages: u32 },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Serialize(message) => write!(f, "document serialize failed: {message}"),
            Self::PageNotFound(id) => write!(f, "page not found: {id}"),
            Self::PageLimitReached { max_pages } => {
                write!(f, "page limit reached ({max_pages} pages)")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Exclusive owner of the document slot.
pub struct DocumentStore<R: KvRepository> {
    repo: R,
    state: DocumentState,
}

impl<R: KvRepository> DocumentStore<R> {
    /// Loads the persisted document, initializing defaults on first run.
    ///
    /// An unreadable blob is replaced by the first-run state. The store is
    /// persisted whenever loading had to initialize or heal anything.
    pub fn load(repo: R) -> StoreResult<Self> {
        let (mut state, mut dirty) = match repo.get(DOCUMENT_SLOT_KEY)? {
            Some(raw) => match serde_json::from_str::<DocumentState>(&raw) {
                Ok(state) => (state, false),
                Err(err) => {
                    warn!(
                        "event=document_load module=store status=degraded reason=unreadable_slot error={err}"
                    );
                    (DocumentState::initial(), true)
                }
            },
            None => {
                info!("event=document_load module=store status=ok reason=first_run");
                (DocumentState::initial(), true)
            }
        };
        dirty |= state.heal();

        let store = Self { repo, state };
        if dirty {
            store.persist(&store.state)?;
        }
        info!(
            "event=document_load module=store status=ok pages={}",
            store.state.pages.len()
        );
        Ok(store)
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn pages(&self) -> &[Page] {
        &self.state.pages
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.state.page(id)
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.state.active_page()
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Appends an empty page and makes it active. Returns its id.
    pub fn create_page(&mut self) -> StoreResult<PageId> {
        self.mutate(|state| {
            let max_pages = state.settings.max_pages;
            if max_pages > 0 && state.pages.len() >= max_pages as usize {
                return Err(StoreError::PageLimitReached { max_pages });
            }
            let page = Page::new(NEW_PAGE_TITLE);
            let id = page.id.clone();
            state.pages.push(page);
            state.active_page_id = Some(id.clone());
            Ok(id)
        })
    }

    pub fn select_page(&mut self, id: &str) -> StoreResult<()> {
        self.mutate(|state| {
            let page_id = state
                .page(id)
                .map(|page| page.id.clone())
                .ok_or_else(|| StoreError::PageNotFound(id.to_string()))?;
            state.active_page_id = Some(page_id);
            Ok(())
        })
    }

    pub fn rename_page(&mut self, id: &str, title: impl Into<String>) -> StoreResult<()> {
        let title = title.into();
        self.mutate(|state| {
            let page = state
                .page_mut(id)
                .ok_or_else(|| StoreError::PageNotFound(id.to_string()))?;
            page.title = title;
            Ok(())
        })
    }

    /// Replaces a page body. Highlight markers are stripped first.
    pub fn update_page_content(&mut self, id: &str, markup: &str) -> StoreResult<()> {
        let content = strip_highlight_markers(markup);
        self.mutate(|state| {
            let page = state
                .page_mut(id)
                .ok_or_else(|| StoreError::PageNotFound(id.to_string()))?;
            page.content = content;
            Ok(())
        })
    }

    /// Removes a page. Deleting the active page selects the first remaining
    /// page, or none when the list becomes empty.
    pub fn delete_page(&mut self, id: &str) -> StoreResult<()> {
        self.mutate(|state| {
            let index = state
                .pages
                .iter()
                .position(|page| page.id == id)
                .ok_or_else(|| StoreError::PageNotFound(id.to_string()))?;
            state.pages.remove(index);
            if state.active_page_id.as_deref() == Some(id) {
                state.active_page_id = state.pages.first().map(|page| page.id.clone());
            }
            Ok(())
        })
    }

    /// Applies `update` to the settings and persists them.
    pub fn update_settings(&mut self, update: impl FnOnce(&mut Settings)) -> StoreResult<()> {
        self.mutate(|state| {
            update(&mut state.settings);
            Ok(())
        })
    }

    /// Restores every option to its default value.
    pub fn reset_settings(&mut self) -> StoreResult<()> {
        self.update_settings(|settings| *settings = Settings::default())
    }

    /// Replaces the whole document, e.g. after a successful import. Repeated
    /// page ids in `next` are reassigned.
    pub fn replace_state(&mut self, next: DocumentState) -> StoreResult<()> {
        self.mutate(|state| {
            *state = next;
            Ok(())
        })
    }

    fn mutate<T>(
        &mut self,
        change: impl FnOnce(&mut DocumentState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut draft = self.state.clone();
        let output = change(&mut draft)?;
        draft.heal();
        self.persist(&draft)?;
        self.state = draft;
        Ok(output)
    }

    fn persist(&self, state: &DocumentState) -> StoreResult<()> {
        let raw =
            serde_json::to_string(state).map_err(|err| StoreError::Serialize(err.to_string()))?;
        self.repo.put(DOCUMENT_SLOT_KEY, &raw)?;
        Ok(())
    }
}
