//! Runtime configuration resolved from the process environment.
//!
//! # Responsibility
//! - Name every recognized environment variable in one place.
//! - Resolve typed values with documented defaults.
//!
//! # Invariants
//! - Resolution never panics; malformed values are reported as errors.
//! - Unset variables fall back to [`defaults`].

use crate::logging::default_log_level;
use crate::vault::codec::KdfParams;
use crate::vault::lockout::LockoutPolicy;
use std::env;
use std::path::PathBuf;

/// Environment variable names.
pub mod env_vars {
    /// Database file holding both persisted slots.
    pub const DB_PATH: &str = "NOTEVAULT_DB_PATH";
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub const LOG_DIR: &str = "NOTEVAULT_LOG_DIR";
    pub const LOG_LEVEL: &str = "NOTEVAULT_LOG_LEVEL";
    pub const MAX_ATTEMPTS: &str = "NOTEVAULT_MAX_ATTEMPTS";
    /// Comma-separated minutes, e.g. `5,15,30`.
    pub const LOCKOUT_MINUTES: &str = "NOTEVAULT_LOCKOUT_MINUTES";
    /// Argon2 memory cost in KiB.
    pub const KDF_M_COST: &str = "NOTEVAULT_KDF_M_COST";
    pub const KDF_T_COST: &str = "NOTEVAULT_KDF_T_COST";
    pub const KDF_P_COST: &str = "NOTEVAULT_KDF_P_COST";
}

/// Default values.
pub mod defaults {
    pub const DB_FILE_NAME: &str = "notevault.sqlite3";
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    pub lockout: LockoutPolicy,
    pub kdf: KdfParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: env::temp_dir().join(defaults::DB_FILE_NAME),
            log_dir: None,
            log_level: default_log_level().to_string(),
            lockout: LockoutPolicy::default(),
            kdf: KdfParams::default(),
        }
    }
}

impl AppConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolves configuration through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(env_vars::DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        config.log_dir = read(env_vars::LOG_DIR).map(PathBuf::from);
        if let Some(level) = read(env_vars::LOG_LEVEL) {
            config.log_level = level;
        }

        let max_attempts = match read(env_vars::MAX_ATTEMPTS) {
            Some(raw) => parse_number(env_vars::MAX_ATTEMPTS, &raw)?,
            None => config.lockout.max_attempts(),
        };
        let durations = match read(env_vars::LOCKOUT_MINUTES) {
            Some(raw) => raw
                .split(',')
                .map(|part| parse_number(env_vars::LOCKOUT_MINUTES, part.trim()))
                .collect::<Result<Vec<u32>, String>>()?,
            None => config.lockout.durations_minutes().to_vec(),
        };
        config.lockout = LockoutPolicy::new(max_attempts, durations)
            .map_err(|err| format!("invalid lockout policy: {err}"))?;

        if let Some(raw) = read(env_vars::KDF_M_COST) {
            config.kdf.m_cost = parse_number(env_vars::KDF_M_COST, &raw)?;
        }
        if let Some(raw) = read(env_vars::KDF_T_COST) {
            config.kdf.t_cost = parse_number(env_vars::KDF_T_COST, &raw)?;
        }
        if let Some(raw) = read(env_vars::KDF_P_COST) {
            config.kdf.p_cost = parse_number(env_vars::KDF_P_COST, &raw)?;
        }
        if !config.kdf.within_bounds() {
            return Err(format!("KDF parameters out of range: {:?}", config.kdf));
        }

        Ok(config)
    }
}

fn parse_number(name: &str, raw: &str) -> Result<u32, String> {
    raw.parse::<u32>()
        .map_err(|err| format!("`{name}` must be a non-negative integer, got `{raw}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{env_vars, AppConfig};
    use crate::vault::codec::KdfParams;
    use crate::vault::lockout::LockoutPolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn resolve(pairs: &[(&str, &str)]) -> Result<AppConfig, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = resolve(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.lockout, LockoutPolicy::default());
        assert_eq!(config.kdf, KdfParams::default());
        assert!(config.db_path.ends_with("notevault.sqlite3"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = resolve(&[
            (env_vars::DB_PATH, "/data/notes.db"),
            (env_vars::LOG_DIR, "/var/log/notevault"),
            (env_vars::LOG_LEVEL, "warn"),
            (env_vars::MAX_ATTEMPTS, "5"),
            (env_vars::LOCKOUT_MINUTES, "1, 2, 4"),
            (env_vars::KDF_T_COST, "3"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/data/notes.db"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/notevault")));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.lockout.max_attempts(), 5);
        assert_eq!(config.lockout.durations_minutes(), &[1, 2, 4]);
        assert_eq!(config.kdf.t_cost, 3);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = resolve(&[(env_vars::LOG_DIR, "  ")]).unwrap();
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = resolve(&[(env_vars::MAX_ATTEMPTS, "three")]).unwrap_err();
        assert!(err.contains(env_vars::MAX_ATTEMPTS));

        let err = resolve(&[(env_vars::LOCKOUT_MINUTES, "30,15")]).unwrap_err();
        assert!(err.contains("lockout policy"));

        let err = resolve(&[(env_vars::KDF_P_COST, "64")]).unwrap_err();
        assert!(err.contains("KDF"));
    }
}
