//! Core domain logic for NoteVault: encrypted backups behind a lockout gate,
//! and in-document search with highlighting.
//! This crate is the single source of truth for vault and search invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod prompt;
pub mod repo;
pub mod search;
pub mod service;
pub mod vault;

pub use config::AppConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::document::{DocumentState, Page, PageId};
pub use model::security::SecurityState;
pub use model::settings::{ImageSize, Settings, Theme};
pub use prompt::{PendingInput, PromptBroker, PromptError, PromptKind, PromptTicket};
pub use repo::kv_repo::{KvRepository, RepoError, RepoResult, SqliteKvRepository};
pub use search::extract::extract_text;
pub use search::highlight::{
    highlight_markup, strip_highlight_markers, Direction, HighlightController, SearchKey,
    SearchOutcome,
};
pub use search::matcher::{find_matches, MatchOptions, SearchMatch};
pub use search::surface::{EditorSurface, MemorySurface};
pub use search::{SearchError, SearchResult};
pub use service::document_store::{DocumentStore, StoreError, StoreResult};
pub use service::editor_session::EditorSession;
pub use service::vault_service::{now_epoch_ms, BackupFile, ImportOutcome, VaultService};
pub use vault::codec::{KdfParams, VaultCodec};
pub use vault::lockout::{GateDecision, LockoutGuard, LockoutPolicy};
pub use vault::{VaultError, VaultResult};

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
