//! Encrypted backup export and gated import.
//!
//! # Responsibility
//! - Ask for a password through the prompt broker.
//! - Seal the full document for export; open and apply a backup on import.
//! - Feed every import outcome into the lockout guard.
//!
//! # Invariants
//! - No password is requested while the gate denies imports.
//! - Gate check, decrypt and outcome recording run as one uninterrupted
//!   sequence per attempt.
//! - A denied or cancelled import never touches the failure counter.
//! - Passwords are zeroized after use and never logged.

use crate::model::document::DocumentState;
use crate::prompt::{PendingInput, PromptBroker, PromptKind};
use crate::repo::kv_repo::KvRepository;
use crate::service::document_store::DocumentStore;
use crate::vault::codec::VaultCodec;
use crate::vault::lockout::{GateDecision, LockoutGuard};
use crate::vault::{VaultError, VaultResult};
use log::{info, warn};
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

/// Download name offered for exported backups.
pub const BACKUP_FILE_NAME: &str = "notevault-backup-encrypted.txt";
pub const EXPORT_PROMPT_TITLE: &str = "Enter password to encrypt:";
pub const IMPORT_PROMPT_TITLE: &str = "Enter password to decrypt:";

/// Exported backup, ready to be written wherever the shell saves files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub file_name: String,
    pub contents: String,
}

/// Result of an import attempt that reached the decrypt step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Backup applied; carries the restored page count.
    Imported { pages: usize },
    /// Mismatch. `locked_for_minutes` is set when this failure engaged a lockout.
    Failed { locked_for_minutes: Option<u32> },
}

impl ImportOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, Self::Imported { .. })
    }

    /// User-facing alerts, in display order.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Imported { .. } => Vec::new(),
            Self::Failed { locked_for_minutes } => {
                let mut messages = vec![VaultError::Mismatch.to_string()];
                if let Some(minutes) = locked_for_minutes {
                    messages.push(format!(
                        "Too many failed attempts. Import is locked for {minutes} minutes."
                    ));
                }
                messages
            }
        }
    }
}

/// Current wall clock in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Backup flows over a lockout guard, a codec and the prompt broker.
///
/// The document store is passed per call so the editor session keeps
/// sole ownership of it.
pub struct VaultService<R: KvRepository> {
    guard: LockoutGuard<R>,
    codec: VaultCodec,
    prompts: PromptBroker,
}

impl<R: KvRepository> VaultService<R> {
    pub fn new(guard: LockoutGuard<R>, codec: VaultCodec) -> Self {
        Self {
            guard,
            codec,
            prompts: PromptBroker::new(),
        }
    }

    pub fn guard(&self) -> &LockoutGuard<R> {
        &self.guard
    }

    pub fn codec(&self) -> &VaultCodec {
        &self.codec
    }

    /// Answering side of the password requests this service opens.
    pub fn prompts_mut(&mut self) -> &mut PromptBroker {
        &mut self.prompts
    }

    /// Read-only gate check, as used to disable the import affordance.
    pub fn check_gate(&self, now_ms: i64) -> GateDecision {
        self.guard.check_gate(now_ms)
    }

    /// Opens the export password request.
    pub fn begin_export(&mut self) -> VaultResult<PendingInput> {
        Ok(self.prompts.open(PromptKind::Password, EXPORT_PROMPT_TITLE)?)
    }

    /// Waits for the export password and seals the document.
    ///
    /// # Errors
    /// - [`VaultError::InputCancelled`] when the request was dismissed.
    pub fn finish_export<S: KvRepository>(
        &self,
        store: &DocumentStore<S>,
        pending: PendingInput,
    ) -> VaultResult<BackupFile> {
        let password = Zeroizing::new(pending.wait().inspect_err(|_| {
            info!("event=vault_export module=vault status=cancelled");
        })?);
        self.export_with_password(store, &password)
    }

    /// Seals the full document under `password`.
    pub fn export_with_password<S: KvRepository>(
        &self,
        store: &DocumentStore<S>,
        password: &str,
    ) -> VaultResult<BackupFile> {
        let contents = self
            .codec
            .encrypt(store.state(), password)
            .inspect_err(|err| {
                warn!(
                    "event=vault_export module=vault status=error reason={}",
                    err.code()
                );
            })?;
        info!(
            "event=vault_export module=vault status=ok pages={} bytes={}",
            store.pages().len(),
            contents.len()
        );
        Ok(BackupFile {
            file_name: BACKUP_FILE_NAME.to_string(),
            contents,
        })
    }

    /// Checks the gate, then opens the import password request.
    ///
    /// # Errors
    /// - [`VaultError::LockedOut`] while a lockout is running.
    /// - [`VaultError::PromptBusy`] when a password request is already open.
    pub fn begin_import(&mut self, now_ms: i64) -> VaultResult<PendingInput> {
        self.ensure_gate_open(now_ms)?;
        Ok(self.prompts.open(PromptKind::Password, IMPORT_PROMPT_TITLE)?)
    }

    /// Waits for the import password and runs the import attempt.
    ///
    /// Cancellation returns [`VaultError::InputCancelled`] with document and
    /// security state untouched.
    pub fn finish_import<S: KvRepository>(
        &mut self,
        store: &mut DocumentStore<S>,
        ciphertext: &str,
        pending: PendingInput,
        now_ms: i64,
    ) -> VaultResult<ImportOutcome> {
        let password = Zeroizing::new(pending.wait().inspect_err(|_| {
            info!("event=vault_import module=vault status=cancelled");
        })?);
        self.import_with_password(store, ciphertext, &password, now_ms)
    }

    /// One import attempt: gate, decrypt, then apply and record the outcome.
    ///
    /// The lockout penalty is cleared only once the document is replaced.
    ///
    /// # Errors
    /// - [`VaultError::LockedOut`] when the gate denies; nothing is recorded.
    /// - [`VaultError::Repo`] / [`VaultError::Store`] on persistence failure.
    pub fn import_with_password<S: KvRepository>(
        &mut self,
        store: &mut DocumentStore<S>,
        ciphertext: &str,
        password: &str,
        now_ms: i64,
    ) -> VaultResult<ImportOutcome> {
        self.ensure_gate_open(now_ms)?;

        match self.codec.decrypt::<DocumentState>(ciphertext, password) {
            Ok(state) => {
                let pages = state.pages.len();
                store.replace_state(state)?;
                self.guard.record_success()?;
                info!("event=vault_import module=vault status=ok pages={pages}");
                Ok(ImportOutcome::Imported { pages })
            }
            Err(VaultError::Mismatch) => {
                let before = self.guard.state();
                self.guard.record_failure(now_ms)?;
                let engaged = before.attempts + 1 >= self.guard.policy().max_attempts();
                let locked_for_minutes =
                    engaged.then(|| self.guard.policy().duration_minutes(before.lockout_level));
                warn!(
                    "event=vault_import module=vault status=error reason=vault_mismatch lockout_engaged={engaged}"
                );
                Ok(ImportOutcome::Failed { locked_for_minutes })
            }
            Err(other) => Err(other),
        }
    }

    fn ensure_gate_open(&self, now_ms: i64) -> VaultResult<()> {
        match self.guard.check_gate(now_ms) {
            GateDecision::Allow => Ok(()),
            GateDecision::Deny { remaining_minutes } => {
                warn!(
                    "event=vault_import module=vault status=denied reason=locked_out remaining_minutes={remaining_minutes}"
                );
                Err(VaultError::LockedOut { remaining_minutes })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ImportOutcome, VaultService, BACKUP_FILE_NAME, IMPORT_PROMPT_TITLE};
    use crate::db::open_db_in_memory;
    use crate::repo::kv_repo::{KvRepository, RepoError, RepoResult, SqliteKvRepository};
    use crate::service::document_store::DocumentStore;
    use crate::vault::codec::{KdfParams, VaultCodec};
    use crate::vault::lockout::{LockoutGuard, LockoutPolicy};
    use crate::vault::VaultError;

    const NOW: i64 = 1_700_000_000_000;

    /// Reads through to SQLite, refuses every write.
    struct ReadOnlyRepo<'conn>(SqliteKvRepository<'conn>);

    impl KvRepository for ReadOnlyRepo<'_> {
        fn get(&self, key: &str) -> RepoResult<Option<String>> {
            self.0.get(key)
        }

        fn put(&self, key: &str, _value: &str) -> RepoResult<()> {
            Err(RepoError::InvalidKey(key.to_string()))
        }

        fn remove(&self, key: &str) -> RepoResult<bool> {
            Err(RepoError::InvalidKey(key.to_string()))
        }
    }

    #[test]
    fn failure_messages_mirror_alerts() {
        let plain = ImportOutcome::Failed {
            locked_for_minutes: None,
        };
        assert_eq!(
            plain.messages(),
            vec!["Decryption failed. Wrong password or corrupted file.".to_string()]
        );

        let locked = ImportOutcome::Failed {
            locked_for_minutes: Some(5),
        };
        assert_eq!(
            locked.messages()[1],
            "Too many failed attempts. Import is locked for 5 minutes."
        );
        assert!(ImportOutcome::Imported { pages: 1 }.messages().is_empty());
    }

    #[test]
    fn export_then_import_through_prompts() {
        let conn = open_db_in_memory().unwrap();
        let mut store = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
        let guard =
            LockoutGuard::load(SqliteKvRepository::new(&conn), LockoutPolicy::default()).unwrap();
        let mut service = VaultService::new(guard, VaultCodec::new(KdfParams::insecure_fast()));

        let pending = service.begin_export().unwrap();
        assert!(service.prompts_mut().submit(pending.ticket(), "hunter2"));
        let backup = service.finish_export(&store, pending).unwrap();
        assert_eq!(backup.file_name, BACKUP_FILE_NAME);

        let pending = service.begin_import(NOW).unwrap();
        assert_eq!(pending.title(), IMPORT_PROMPT_TITLE);
        assert!(service.prompts_mut().submit(pending.ticket(), "hunter2"));
        let outcome = service
            .finish_import(&mut store, &backup.contents, pending, NOW)
            .unwrap();
        assert_eq!(outcome, ImportOutcome::Imported { pages: 1 });
    }

    #[test]
    fn failed_document_write_keeps_lockout_penalty() {
        let conn = open_db_in_memory().unwrap();
        let writable = DocumentStore::load(SqliteKvRepository::new(&conn)).unwrap();
        let guard =
            LockoutGuard::load(SqliteKvRepository::new(&conn), LockoutPolicy::default()).unwrap();
        let mut service = VaultService::new(guard, VaultCodec::new(KdfParams::insecure_fast()));
        let backup = service.export_with_password(&writable, "right").unwrap();

        let mut read_only = DocumentStore::load(ReadOnlyRepo(SqliteKvRepository::new(&conn))).unwrap();
        service
            .import_with_password(&mut read_only, &backup.contents, "wrong", NOW)
            .unwrap();
        assert_eq!(service.guard().state().attempts, 1);

        let err = service
            .import_with_password(&mut read_only, &backup.contents, "right", NOW)
            .unwrap_err();
        assert!(matches!(err, VaultError::Store(_)));
        assert_eq!(service.guard().state().attempts, 1);
    }

    #[test]
    fn abandoned_prompt_does_not_block_the_next_import() {
        let conn = open_db_in_memory().unwrap();
        let guard =
            LockoutGuard::load(SqliteKvRepository::new(&conn), LockoutPolicy::default()).unwrap();
        let mut service = VaultService::new(guard, VaultCodec::new(KdfParams::insecure_fast()));

        drop(service.begin_import(NOW).unwrap());
        let pending = service.begin_import(NOW).unwrap();
        assert_eq!(pending.title(), IMPORT_PROMPT_TITLE);
    }

    #[test]
    fn second_password_request_is_busy() {
        let conn = open_db_in_memory().unwrap();
        let guard =
            LockoutGuard::load(SqliteKvRepository::new(&conn), LockoutPolicy::default()).unwrap();
        let mut service = VaultService::new(guard, VaultCodec::new(KdfParams::insecure_fast()));

        let _open = service.begin_export().unwrap();
        let err = service.begin_import(NOW).unwrap_err();
        assert!(matches!(err, VaultError::PromptBusy(_)));
    }
}
