//! CLI smoke and ops entry point.
//!
//! # Responsibility
//! - Verify `notevault_core` linkage with deterministic output.
//! - Run backup export/import and page search against the configured database.
//!
//! Passwords are read from the first line of stdin; an empty line cancels.

use notevault_core::search::extract::extract_text;
use notevault_core::{
    find_matches, init_from_config, now_epoch_ms, open_db, AppConfig, DocumentStore,
    ImportOutcome, KvRepository, LockoutGuard, MatchOptions, PromptBroker, PromptTicket,
    SqliteKvRepository, VaultCodec, VaultService,
};
use rusqlite::Connection;
use std::io::BufRead;
use std::process::ExitCode;

const USAGE: &str = "usage: notevault_cli [ping | pages | search <query> | export <file> | import <file>]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let command = args.first().map(String::as_str).unwrap_or("ping");
    if command == "ping" {
        println!("notevault_core ping={}", notevault_core::ping());
        println!("notevault_core version={}", notevault_core::core_version());
        return Ok(());
    }

    let config = AppConfig::from_env()?;
    init_from_config(&config)?;
    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;

    match (command, args.get(1)) {
        ("pages", _) => list_pages(&conn),
        ("search", Some(query)) => search(&conn, query),
        ("export", Some(path)) => export(&conn, &config, path),
        ("import", Some(path)) => import(&conn, &config, path),
        _ => Err(USAGE.to_string()),
    }
}

fn list_pages(conn: &Connection) -> Result<(), String> {
    let store = DocumentStore::load(SqliteKvRepository::new(conn)).map_err(|err| err.to_string())?;
    let active = store.state().active_page_id.as_deref();
    for page in store.pages() {
        let marker = if Some(page.id.as_str()) == active { "*" } else { " " };
        println!("{marker} {} {}", page.id, page.title);
    }
    Ok(())
}

fn search(conn: &Connection, query: &str) -> Result<(), String> {
    let store = DocumentStore::load(SqliteKvRepository::new(conn)).map_err(|err| err.to_string())?;
    for line in search_lines(&store, query) {
        println!("{line}");
    }
    Ok(())
}

/// One `title @offset: before[match]after` line per hit across all pages.
fn search_lines<R: KvRepository>(store: &DocumentStore<R>, query: &str) -> Vec<String> {
    let query = query.trim();
    let options = MatchOptions {
        case_sensitive: store.settings().search_case_sensitive,
        whole_words: store.settings().search_whole_words,
    };
    let mut lines = Vec::new();
    for page in store.pages() {
        let text = extract_text(Some(page.title.as_str()), &page.content);
        for hit in find_matches(&text, query, options) {
            let (before, matched, after) = hit.segments();
            lines.push(format!("{} @{}: {before}[{matched}]{after}", page.title, hit.absolute_index));
        }
    }
    lines
}

fn export(conn: &Connection, config: &AppConfig, path: &str) -> Result<(), String> {
    let store = DocumentStore::load(SqliteKvRepository::new(conn)).map_err(|err| err.to_string())?;
    let mut vault = vault_service(conn, config)?;
    let pending = vault.begin_export().map_err(|err| err.to_string())?;
    answer_prompt(vault.prompts_mut(), pending.ticket(), pending.title())?;

    let backup = vault
        .finish_export(&store, pending)
        .map_err(|err| err.to_string())?;
    std::fs::write(path, &backup.contents).map_err(|err| format!("write `{path}` failed: {err}"))?;
    println!("exported {} pages to {path}", store.pages().len());
    Ok(())
}

fn import(conn: &Connection, config: &AppConfig, path: &str) -> Result<(), String> {
    let contents =
        std::fs::read_to_string(path).map_err(|err| format!("read `{path}` failed: {err}"))?;
    let mut store =
        DocumentStore::load(SqliteKvRepository::new(conn)).map_err(|err| err.to_string())?;
    let mut vault = vault_service(conn, config)?;
    let now = now_epoch_ms();
    let pending = vault.begin_import(now).map_err(|err| err.to_string())?;
    answer_prompt(vault.prompts_mut(), pending.ticket(), pending.title())?;

    let outcome = vault
        .finish_import(&mut store, &contents, pending, now)
        .map_err(|err| err.to_string())?;
    match outcome {
        ImportOutcome::Imported { pages } => {
            println!("imported {pages} pages");
            Ok(())
        }
        failed => Err(failed.messages().join("\n")),
    }
}

fn vault_service<'conn>(
    conn: &'conn Connection,
    config: &AppConfig,
) -> Result<VaultService<SqliteKvRepository<'conn>>, String> {
    let guard = LockoutGuard::load(SqliteKvRepository::new(conn), config.lockout.clone())
        .map_err(|err| err.to_string())?;
    Ok(VaultService::new(guard, VaultCodec::new(config.kdf)))
}

/// Reads one stdin line as the answer to `ticket`. An empty line cancels.
fn answer_prompt(broker: &mut PromptBroker, ticket: PromptTicket, title: &str) -> Result<(), String> {
    eprintln!("{title}");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| format!("read password failed: {err}"))?;
    let answer = line.trim_end_matches(['\r', '\n']);
    if !broker.submit(ticket, answer) {
        broker.cancel(ticket);
    }
    Ok(())
}
