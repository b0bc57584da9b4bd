//! Runtime configuration for a task list session.
//!
//! # Invariants
//! - `validate()` must pass before a config is used to build a session.
//! - Missing JSON fields fall back to `Default` values.

use crate::debounce::DEFAULT_DEBOUNCE;
use crate::logging::{default_log_level, normalize_level};
use crate::persist::{PersistenceGateway, DEFAULT_STORAGE_KEY};
use crate::repo::slot_repo::{MemorySlotRepository, SlotRepository, SqliteSlotRepository};
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Default byte budget for the slot store, matching common browser quotas.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskListConfig {
    /// Slot key the collection is stored under.
    pub storage_key: String,
    /// Total byte budget of the slot store; `None` disables the limit.
    pub quota_bytes: Option<usize>,
    /// Quiet period before a draft is validated.
    pub draft_debounce_ms: u64,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
}

impl Default for TaskListConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            draft_debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            log_level: default_log_level().to_string(),
        }
    }
}

impl TaskListConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(document).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        if self.quota_bytes == Some(0) {
            return Err(ConfigError::ZeroQuota);
        }
        if self.draft_debounce_ms == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        normalize_level(&self.log_level).map_err(ConfigError::InvalidLogLevel)?;
        Ok(())
    }

    pub fn draft_debounce(&self) -> Duration {
        Duration::from_millis(self.draft_debounce_ms)
    }

    /// Gateway over `repo` writing to the configured slot key.
    pub fn gateway<R: SlotRepository>(&self, repo: R) -> PersistenceGateway<R> {
        PersistenceGateway::with_key(repo, self.storage_key.clone())
    }

    /// Ephemeral backend honoring the configured quota.
    pub fn memory_repository(&self) -> MemorySlotRepository {
        match self.quota_bytes {
            Some(quota) => MemorySlotRepository::with_quota(quota),
            None => MemorySlotRepository::new(),
        }
    }

    /// SQLite backend over a migrated connection, honoring the configured quota.
    pub fn sqlite_repository<'conn>(&self, conn: &'conn Connection) -> SqliteSlotRepository<'conn> {
        SqliteSlotRepository::new(conn).with_quota(self.quota_bytes)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    EmptyStorageKey,
    ZeroQuota,
    ZeroDebounce,
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::EmptyStorageKey => write!(f, "storage_key must not be empty"),
            Self::ZeroQuota => write!(f, "quota_bytes must be positive when set"),
            Self::ZeroDebounce => write!(f, "draft_debounce_ms must be positive"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}
