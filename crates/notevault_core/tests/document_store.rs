use notevault_core::model::document::{
    DocumentState, Page, EMPTY_PAGE_CONTENT, FIRST_PAGE_TITLE, NEW_PAGE_TITLE,
};
use notevault_core::model::settings::{Settings, Theme};
use notevault_core::service::document_store::{DocumentStore, StoreError, DOCUMENT_SLOT_KEY};
use notevault_core::{open_db_in_memory, KvRepository, SqliteKvRepository};
use rusqlite::Connection;

fn persisted(conn: &Connection) -> DocumentState {
    let raw = SqliteKvRepository::new(conn)
        .get(DOCUMENT_SLOT_KEY)
        .unwrap()
        .expect("document slot should be written");
    serde_json::from_str(&raw).unwrap()
}

fn seed(conn: &Connection, state: &DocumentState) {
    SqliteKvRepository::new(conn)
        .put(DOCUMENT_SLOT_KEY, &serde_json::to_string(state).unwrap())
        .unwrap();
}

#[test]
fn first_run_initializes_and_persists_default_document() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();

    assert_eq!(store.pages().len(), 1);
    let page = store.active_page().unwrap();
    assert_eq!(page.title, FIRST_PAGE_TITLE);
    assert_eq!(page.content, EMPTY_PAGE_CONTENT);
    assert_eq!(store.settings(), &Settings::default());
    assert_eq!(&persisted(&conn), store.state());
}

#[test]
fn deleting_only_active_page_leaves_no_active_page() {
    let conn = open_db_in_memory().unwrap();
    seed(
        &conn,
        &DocumentState {
            pages: vec![Page::with_id("1", "Hello", "<p>Hello world</p>")],
            active_page_id: Some("1".to_string()),
            settings: Settings::default(),
        },
    );
    let mut store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();

    store.delete_page("1").unwrap();

    assert!(store.pages().is_empty());
    assert_eq!(store.state().active_page_id, None);
    let saved = persisted(&conn);
    assert!(saved.pages.is_empty());
    assert_eq!(saved.active_page_id, None);
}

#[test]
fn deleting_active_page_selects_first_remaining() {
    let conn = open_db_in_memory().unwrap();
    seed(
        &conn,
        &DocumentState {
            pages: vec![
                Page::with_id("a", "A", "<p>a</p>"),
                Page::with_id("b", "B", "<p>b</p>"),
                Page::with_id("c", "C", "<p>c</p>"),
            ],
            active_page_id: Some("b".to_string()),
            settings: Settings::default(),
        },
    );
    let mut store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();

    store.delete_page("b").unwrap();
    assert_eq!(store.state().active_page_id.as_deref(), Some("a"));

    store.delete_page("c").unwrap();
    assert_eq!(store.state().active_page_id.as_deref(), Some("a"));
}

#[test]
fn dangling_active_page_is_healed_on_load() {
    let conn = open_db_in_memory().unwrap();
    seed(
        &conn,
        &DocumentState {
            pages: vec![Page::with_id("x", "X", "<p>x</p>")],
            active_page_id: Some("gone".to_string()),
            settings: Settings::default(),
        },
    );

    let store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
    assert_eq!(store.state().active_page_id.as_deref(), Some("x"));
    assert_eq!(persisted(&conn).active_page_id.as_deref(), Some("x"));
}

#[test]
fn unreadable_slot_falls_back_to_defaults() {
    let conn = open_db_in_memory().unwrap();
    SqliteKvRepository::new(&conn)
        .put(DOCUMENT_SLOT_KEY, "{not json")
        .unwrap();

    let store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
    assert_eq!(store.pages().len(), 1);
    assert_eq!(store.pages()[0].title, FIRST_PAGE_TITLE);
}

#[test]
fn missing_settings_keys_are_backfilled() {
    let conn = open_db_in_memory().unwrap();
    SqliteKvRepository::new(&conn)
        .put(
            DOCUMENT_SLOT_KEY,
            r#"{"pages":[{"id":"1","title":"T","content":"<p></p>"}],"activePageId":"1","settings":{"theme":"light","fontSize":"18"}}"#,
        )
        .unwrap();

    let store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
    let settings = store.settings();
    assert_eq!(settings.theme, Theme::Light);
    assert_eq!(settings.font_size, 18);
    assert_eq!(settings.max_pages, Settings::default().max_pages);
    assert!(settings.spell_check);
}

#[test]
fn bad_settings_values_keep_pages() {
    let conn = open_db_in_memory().unwrap();
    SqliteKvRepository::new(&conn)
        .put(
            DOCUMENT_SLOT_KEY,
            r#"{"pages":[{"id":"a","title":"Diary","content":"<p>day one</p>"}],"activePageId":"a","settings":{"theme":"system","lineHeight":null,"fontSize":20}}"#,
        )
        .unwrap();

    let store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
    assert_eq!(store.pages().len(), 1);
    assert_eq!(store.pages()[0].title, "Diary");
    assert_eq!(store.settings().theme, Theme::Dark);
    assert_eq!(store.settings().font_size, 20);

    let raw = SqliteKvRepository::new(&conn)
        .get(DOCUMENT_SLOT_KEY)
        .unwrap()
        .unwrap();
    assert!(raw.contains("Diary"));
}

#[test]
fn create_select_rename_and_edit_persist() {
    let conn = open_db_in_memory().unwrap();
    let mut store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
    let first = store.active_page().unwrap().id.clone();

    let second = store.create_page().unwrap();
    assert_ne!(first, second);
    assert_eq!(store.active_page().unwrap().title, NEW_PAGE_TITLE);

    store.select_page(&first).unwrap();
    store.rename_page(&first, "Groceries").unwrap();
    store
        .update_page_content(&first, r#"<p>buy <mark class="highlight">milk</mark></p>"#)
        .unwrap();

    let saved = persisted(&conn);
    assert_eq!(saved.active_page_id.as_deref(), Some(first.as_str()));
    let page = saved.page(&first).unwrap();
    assert_eq!(page.title, "Groceries");
    assert_eq!(page.content, "<p>buy milk</p>");
    assert_eq!(saved.pages.len(), 2);
}

#[test]
fn unknown_page_is_reported_and_state_untouched() {
    let conn = open_db_in_memory().unwrap();
    let mut store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
    let before = store.state().clone();

    let err = store.select_page("missing").unwrap_err();
    assert!(matches!(err, StoreError::PageNotFound(ref id) if id == "missing"));
    assert!(store.delete_page("missing").is_err());
    assert_eq!(store.state(), &before);
}

#[test]
fn page_limit_is_enforced() {
    let conn = open_db_in_memory().unwrap();
    let mut store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
    store.update_settings(|settings| settings.max_pages = 2).unwrap();

    store.create_page().unwrap();
    let err = store.create_page().unwrap_err();
    assert!(matches!(err, StoreError::PageLimitReached { max_pages: 2 }));
    assert_eq!(store.pages().len(), 2);
}

#[test]
fn reset_settings_restores_defaults() {
    let conn = open_db_in_memory().unwrap();
    let mut store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
    store
        .update_settings(|settings| {
            settings.theme = Theme::Light;
            settings.search_case_sensitive = true;
        })
        .unwrap();
    assert_eq!(persisted(&conn).settings.theme, Theme::Light);

    store.reset_settings().unwrap();
    assert_eq!(store.settings(), &Settings::default());
    assert_eq!(persisted(&conn).settings, Settings::default());
}
