//! Progressive lockout state machine for decrypt attempts.
//!
//! # Responsibility
//! - Decide whether a decrypt attempt may run at a given instant.
//! - Count failures and escalate lockout duration per completed cycle.
//! - Persist [`SecurityState`] in its own slot after every transition.
//!
//! # Invariants
//! - `lockout_level` is always a valid index into the duration table.
//! - `attempts` is below `max_attempts` outside the crossing instant.
//! - Gate checks never mutate state.
//! - Success wipes attempts, level and deadline unconditionally.

use crate::model::security::SecurityState;
use crate::repo::kv_repo::{KvRepository, RepoResult};
use log::{info, warn};

/// Persisted slot key for lockout accounting.
pub const SECURITY_SLOT_KEY: &str = "notevault.security";
/// Failures tolerated before a lockout engages.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Lockout durations per level, in minutes.
pub const DEFAULT_LOCKOUT_MINUTES: [u32; 3] = [5, 15, 30];

const MILLIS_PER_MINUTE: i64 = 60 * 1000;

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Ceiling of the remaining lockout, in whole minutes.
    Deny { remaining_minutes: u64 },
}

/// Threshold and escalating duration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    durations_minutes: Vec<u32>,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            durations_minutes: DEFAULT_LOCKOUT_MINUTES.to_vec(),
        }
    }
}

impl LockoutPolicy {
    /// Builds a policy from a threshold and a duration table.
    ///
    /// # Errors
    /// - `max_attempts` is zero.
    /// - The table is empty or decreases anywhere.
    pub fn new(max_attempts: u32, durations_minutes: Vec<u32>) -> Result<Self, String> {
        if max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if durations_minutes.is_empty() {
            return Err("lockout duration table cannot be empty".to_string());
        }
        if durations_minutes.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err("lockout durations must be non-decreasing".to_string());
        }
        Ok(Self {
            max_attempts,
            durations_minutes,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn durations_minutes(&self) -> &[u32] {
        &self.durations_minutes
    }

    fn last_level(&self) -> usize {
        self.durations_minutes.len() - 1
    }

    /// Duration applied when a lockout engages at `level`.
    pub fn duration_minutes(&self, level: usize) -> u32 {
        self.durations_minutes[level.min(self.last_level())]
    }

    /// Pure gate check.
    pub fn gate(&self, state: &SecurityState, now_ms: i64) -> GateDecision {
        match state.lockout_until {
            Some(until) if until > now_ms => GateDecision::Deny {
                remaining_minutes: ceil_minutes(until - now_ms),
            },
            _ => GateDecision::Allow,
        }
    }

    /// Pure failure transition.
    pub fn after_failure(&self, state: SecurityState, now_ms: i64) -> SecurityState {
        let mut next = self.normalize(state);
        next.attempts = next.attempts.saturating_add(1);
        if next.attempts < self.max_attempts {
            return next;
        }

        let minutes = self.duration_minutes(next.lockout_level);
        next.lockout_until = Some(now_ms.saturating_add(i64::from(minutes) * MILLIS_PER_MINUTE));
        next.attempts = 0;
        if next.lockout_level < self.last_level() {
            next.lockout_level += 1;
        }
        next
    }

    /// Pure success transition.
    pub fn after_success(&self) -> SecurityState {
        SecurityState::default()
    }

    /// Clamps a state read from storage back into the policy's bounds.
    pub fn normalize(&self, mut state: SecurityState) -> SecurityState {
        state.lockout_level = state.lockout_level.min(self.last_level());
        state
    }
}

fn ceil_minutes(remaining_ms: i64) -> u64 {
    let remaining_ms = remaining_ms.max(0) as u64;
    remaining_ms.div_ceil(MILLIS_PER_MINUTE as u64)
}

/// Persisted lockout guard. Exclusive owner of [`SecurityState`].
pub struct LockoutGuard<R: KvRepository> {
    repo: R,
    policy: LockoutPolicy,
    state: SecurityState,
}

impl<R: KvRepository> LockoutGuard<R> {
    /// Loads the security slot, defaulting to zeros when absent or unreadable.
    pub fn load(repo: R, policy: LockoutPolicy) -> RepoResult<Self> {
        let state = match repo.get(SECURITY_SLOT_KEY)? {
            Some(raw) => serde_json::from_str::<SecurityState>(&raw).unwrap_or_else(|err| {
                warn!(
                    "event=security_load module=vault status=degraded reason=unreadable_slot error={err}"
                );
                SecurityState::default()
            }),
            None => SecurityState::default(),
        };
        let state = policy.normalize(state);
        Ok(Self {
            repo,
            policy,
            state,
        })
    }

    pub fn state(&self) -> SecurityState {
        self.state
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Read-only gate check at `now_ms`.
    pub fn check_gate(&self, now_ms: i64) -> GateDecision {
        self.policy.gate(&self.state, now_ms)
    }

    /// Counts one failed attempt and persists the result.
    pub fn record_failure(&mut self, now_ms: i64) -> RepoResult<SecurityState> {
        let level_before = self.state.lockout_level;
        let next = self.policy.after_failure(self.state, now_ms);
        self.persist(next)?;

        if next.is_locked_at(now_ms) && next.attempts == 0 {
            info!(
                "event=lockout_engaged module=vault status=ok level={} minutes={}",
                level_before,
                self.policy.duration_minutes(level_before)
            );
        } else {
            info!(
                "event=decrypt_failure module=vault status=ok attempts={} max_attempts={}",
                next.attempts, self.policy.max_attempts
            );
        }
        Ok(next)
    }

    /// Clears all accumulated penalty and persists the zero state.
    pub fn record_success(&mut self) -> RepoResult<SecurityState> {
        let next = self.policy.after_success();
        self.persist(next)?;
        info!("event=lockout_reset module=vault status=ok");
        Ok(next)
    }

    fn persist(&mut self, next: SecurityState) -> RepoResult<()> {
        // Serializing a flat struct of integers cannot fail.
        let raw = serde_json::to_string(&next).unwrap_or_default();
        self.repo.put(SECURITY_SLOT_KEY, &raw)?;
        self.state = next;
        Ok(())
    }
}
