//! Encrypted backup and brute-force protection.
//!
//! # Responsibility
//! - Seal and open full document snapshots under a password ([`codec`]).
//! - Gate decrypt attempts behind an escalating lockout ([`lockout`]).
//!
//! # Invariants
//! - Wrong password and corrupted input are indistinguishable to callers.
//! - Only a decrypt attempt that actually ran may touch the failure counter.

use crate::prompt::{PromptError, PromptKind};
use crate::repo::kv_repo::RepoError;
use crate::service::document_store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod codec;
pub mod lockout;

pub type VaultResult<T> = Result<T, VaultError>;

/// Recoverable vault-flow failures, surfaced to the user as messages.
#[derive(Debug)]
pub enum VaultError {
    /// Wrong password, or truncated/corrupted ciphertext.
    Mismatch,
    /// Gate denied the attempt before any decrypt ran.
    LockedOut { remaining_minutes: u64 },
    /// The user dismissed the password request.
    InputCancelled,
    /// A request of the same kind is already outstanding.
    PromptBusy(PromptKind),
    /// Value could not be sealed.
    Encode(String),
    /// Security slot could not be read or written.
    Repo(RepoError),
    /// Document slot could not be written after a successful import.
    Store(StoreError),
}

impl Display for VaultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mismatch => write!(f, "Decryption failed. Wrong password or corrupted file."),
            Self::LockedOut { remaining_minutes } => write!(
                f,
                "Too many failed attempts. Please try again in {remaining_minutes} minutes."
            ),
            Self::InputCancelled => write!(f, "input cancelled"),
            Self::PromptBusy(kind) => write!(f, "a {} request is already open", kind.as_str()),
            Self::Encode(message) => write!(f, "vault encode failed: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VaultError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for VaultError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<StoreError> for VaultError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl VaultError {
    /// Stable short code for structured log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Mismatch => "vault_mismatch",
            Self::LockedOut { .. } => "locked_out",
            Self::InputCancelled => "input_cancelled",
            Self::PromptBusy(_) => "prompt_busy",
            Self::Encode(_) => "encode_failed",
            Self::Repo(_) => "repo_failed",
            Self::Store(_) => "store_failed",
        }
    }
}

impl From<PromptError> for VaultError {
    fn from(value: PromptError) -> Self {
        match value {
            PromptError::Busy(kind) => Self::PromptBusy(kind),
            PromptError::Cancelled => Self::InputCancelled,
        }
    }
}
