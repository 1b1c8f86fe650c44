//! FFI use-case API for the Flutter shell.
//!
//! # Responsibility
//! - Expose page, search and backup use cases as sync FRB calls.
//! - Flatten core results into plain response envelopes.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Every call opens the database, runs one use case and closes it.
//! - Passwords and page content never reach log lines.

use log::warn;
use notevault_core::search::extract::extract_text;
use notevault_core::search::highlight::{
    highlight_markup as highlight_markup_inner, results_summary,
};
use notevault_core::{
    core_version as core_version_inner, find_matches, init_logging as init_logging_inner,
    now_epoch_ms, open_db, ping as ping_inner, AppConfig, DocumentStore, GateDecision,
    ImportOutcome, LockoutGuard, MatchOptions, SqliteKvRepository, StoreResult, VaultCodec,
    VaultError, VaultService,
};
use rusqlite::Connection;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
/// Repeating the same `level + log_dir` is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One row of the page list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub active: bool,
}

/// Page list envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageListResponse {
    pub ok: bool,
    pub pages: Vec<PageSummary>,
    pub message: String,
}

/// Full page payload for the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDetail {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// Generic page command envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageActionResponse {
    pub ok: bool,
    /// Affected page, when the command produces one.
    pub page_id: Option<String>,
    pub message: String,
}

impl PageActionResponse {
    fn success(message: impl Into<String>, page_id: Option<String>) -> Self {
        Self {
            ok: true,
            page_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            page_id: None,
            message: message.into(),
        }
    }
}

/// One search hit, pre-split for preview rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub index: u32,
    pub before: String,
    pub matched: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
    /// `No results`, `1 result` or `N results`.
    pub summary: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupResponse {
    pub ok: bool,
    pub file_name: String,
    pub contents: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResponse {
    pub ok: bool,
    pub imported_pages: Option<u32>,
    /// Alerts to show, in order.
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResponse {
    pub locked: bool,
    pub remaining_minutes: u64,
    pub message: String,
}

/// Lists pages in display order.
#[flutter_rust_bridge::frb(sync)]
pub fn list_pages() -> PageListResponse {
    match with_store(|store| {
        let active = store.state().active_page_id.clone();
        Ok(store
            .pages()
            .iter()
            .map(|page| PageSummary {
                id: page.id.clone(),
                title: page.title.clone(),
                active: active.as_deref() == Some(page.id.as_str()),
            })
            .collect::<Vec<_>>())
    }) {
        Ok(pages) => PageListResponse {
            ok: true,
            pages,
            message: String::new(),
        },
        Err(err) => PageListResponse {
            ok: false,
            pages: Vec::new(),
            message: format!("list_pages failed: {err}"),
        },
    }
}

/// Active page, or `None` when the document has no pages or cannot be read.
#[flutter_rust_bridge::frb(sync)]
pub fn active_page() -> Option<PageDetail> {
    with_store(|store| {
        Ok(store.active_page().map(|page| PageDetail {
            id: page.id.clone(),
            title: page.title.clone(),
            content: page.content.clone(),
        }))
    })
    .ok()
    .flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn create_page() -> PageActionResponse {
    match with_store(|store| store.create_page()) {
        Ok(id) => PageActionResponse::success("Page created.", Some(id)),
        Err(err) => PageActionResponse::failure(format!("create_page failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn select_page(page_id: String) -> PageActionResponse {
    match with_store(|store| store.select_page(&page_id)) {
        Ok(()) => PageActionResponse::success("Page selected.", Some(page_id)),
        Err(err) => PageActionResponse::failure(format!("select_page failed: {err}")),
    }
}

/// Saves title and body of one page. Highlight markers are stripped.
#[flutter_rust_bridge::frb(sync)]
pub fn save_page(page_id: String, title: String, content: String) -> PageActionResponse {
    let result = with_store(|store| {
        store.rename_page(&page_id, title.trim())?;
        store.update_page_content(&page_id, &content)
    });
    match result {
        Ok(()) => PageActionResponse::success("Page saved.", Some(page_id)),
        Err(err) => PageActionResponse::failure(format!("save_page failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_page(page_id: String) -> PageActionResponse {
    match with_store(|store| {
        store.delete_page(&page_id)?;
        Ok(store.state().active_page_id.clone())
    }) {
        Ok(active) => PageActionResponse::success("Page deleted.", active),
        Err(err) => PageActionResponse::failure(format!("delete_page failed: {err}")),
    }
}

/// Searches the active page with the stored search options.
#[flutter_rust_bridge::frb(sync)]
pub fn search_active_page(query: String) -> SearchResponse {
    let result = with_store(|store| {
        let options = stored_match_options(store);
        Ok(store.active_page().map(|page| {
            let text = extract_text(Some(page.title.as_str()), &page.content);
            find_matches(&text, query.trim(), options)
        }))
    });

    match result {
        Ok(hits) => {
            let items = hits
                .unwrap_or_default()
                .iter()
                .enumerate()
                .map(|(index, hit)| {
                    let (before, matched, after) = hit.segments();
                    SearchItem {
                        index: index as u32,
                        before: before.to_string(),
                        matched: matched.to_string(),
                        after: after.to_string(),
                    }
                })
                .collect::<Vec<_>>();
            SearchResponse {
                summary: results_summary(items.len()),
                items,
                message: String::new(),
            }
        }
        Err(err) => SearchResponse {
            items: Vec::new(),
            summary: results_summary(0),
            message: format!("search_active_page failed: {err}"),
        },
    }
}

/// Highlights `query` in `markup` with the stored search options.
///
/// Falls back to the unchanged markup when settings cannot be read.
#[flutter_rust_bridge::frb(sync)]
pub fn highlight_markup(markup: String, query: String) -> String {
    let query = query.trim();
    if query.is_empty() {
        return markup;
    }
    match with_store(|store| Ok(stored_match_options(store))) {
        Ok(options) => highlight_markup_inner(&markup, query, options),
        Err(_) => markup,
    }
}

/// Seals the whole document under `password`.
#[flutter_rust_bridge::frb(sync)]
pub fn export_backup(password: String) -> BackupResponse {
    if password.is_empty() {
        return BackupResponse {
            ok: false,
            file_name: String::new(),
            contents: String::new(),
            message: VaultError::InputCancelled.to_string(),
        };
    }

    let result = with_vault(|conn, vault| {
        let store = DocumentStore::load(SqliteKvRepository::new(conn))?;
        vault.export_with_password(&store, &password)
    });
    match result {
        Ok(backup) => BackupResponse {
            ok: true,
            file_name: backup.file_name,
            contents: backup.contents,
            message: "Backup exported.".to_string(),
        },
        Err(err) => BackupResponse {
            ok: false,
            file_name: String::new(),
            contents: String::new(),
            message: err,
        },
    }
}

/// One gated import attempt.
#[flutter_rust_bridge::frb(sync)]
pub fn import_backup(contents: String, password: String) -> ImportResponse {
    if password.is_empty() {
        return ImportResponse {
            ok: false,
            imported_pages: None,
            messages: vec![VaultError::InputCancelled.to_string()],
        };
    }

    let result = with_vault(|conn, vault| {
        let mut store = DocumentStore::load(SqliteKvRepository::new(conn))?;
        vault.import_with_password(&mut store, &contents, &password, now_epoch_ms())
    });
    match result {
        Ok(outcome @ ImportOutcome::Imported { pages }) => ImportResponse {
            ok: true,
            imported_pages: Some(pages as u32),
            messages: outcome.messages(),
        },
        Ok(outcome) => ImportResponse {
            ok: false,
            imported_pages: None,
            messages: outcome.messages(),
        },
        Err(message) => ImportResponse {
            ok: false,
            imported_pages: None,
            messages: vec![message],
        },
    }
}

/// Whether imports are currently locked, for disabling the import button.
#[flutter_rust_bridge::frb(sync)]
pub fn import_gate() -> GateResponse {
    match with_vault(|_, vault| Ok(vault.check_gate(now_epoch_ms()))) {
        Ok(GateDecision::Allow) => GateResponse {
            locked: false,
            remaining_minutes: 0,
            message: String::new(),
        },
        Ok(GateDecision::Deny { remaining_minutes }) => GateResponse {
            locked: true,
            remaining_minutes,
            message: VaultError::LockedOut { remaining_minutes }.to_string(),
        },
        Err(err) => GateResponse {
            locked: false,
            remaining_minutes: 0,
            message: err,
        },
    }
}

fn config() -> &'static AppConfig {
    CONFIG.get_or_init(|| {
        AppConfig::from_env().unwrap_or_else(|err| {
            warn!("event=config_load module=ffi status=degraded error={err}");
            AppConfig::default()
        })
    })
}

fn open_connection() -> Result<Connection, String> {
    open_db(&config().db_path).map_err(|err| format!("DB open failed: {err}"))
}

fn with_store<T>(
    f: impl FnOnce(&mut DocumentStore<SqliteKvRepository<'_>>) -> StoreResult<T>,
) -> Result<T, String> {
    let conn = open_connection()?;
    let mut store = DocumentStore::load(SqliteKvRepository::new(&conn))
        .map_err(|err| format!("document load failed: {err}"))?;
    f(&mut store).map_err(|err| err.to_string())
}

fn with_vault<T>(
    f: impl FnOnce(&Connection, &mut VaultService<SqliteKvRepository<'_>>) -> Result<T, VaultError>,
) -> Result<T, String> {
    let conn = open_connection()?;
    let guard = LockoutGuard::load(SqliteKvRepository::new(&conn), config().lockout.clone())
        .map_err(|err| format!("security load failed: {err}"))?;
    let mut vault = VaultService::new(guard, VaultCodec::new(config().kdf));
    f(&conn, &mut vault).map_err(|err| err.to_string())
}

fn stored_match_options(store: &DocumentStore<SqliteKvRepository<'_>>) -> MatchOptions {
    let settings = store.settings();
    MatchOptions {
        case_sensitive: settings.search_case_sensitive,
        whole_words: settings.search_whole_words,
    }
}
