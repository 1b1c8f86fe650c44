//! Brute-force protection state.
//!
//! Persisted in its own slot so that a corrupted document never affects
//! lockout accounting and vice versa. Only the lockout guard mutates it.

use serde::{Deserialize, Serialize};

/// Failed-attempt counter and escalating lockout pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityState {
    /// Consecutive failures since the last lockout or success.
    pub attempts: u32,
    /// Index into the lockout duration table.
    pub lockout_level: usize,
    /// Unix epoch milliseconds. `None` when never locked or after success.
    pub lockout_until: Option<i64>,
}

impl SecurityState {
    /// Returns whether imports are locked at `now_ms`.
    pub fn is_locked_at(&self, now_ms: i64) -> bool {
        self.lockout_until.is_some_and(|until| until > now_ms)
    }
}
