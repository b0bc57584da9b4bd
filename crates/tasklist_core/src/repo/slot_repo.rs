//! Slot repository contract and implementations.

use crate::db::DbError;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SlotResult<T> = Result<T, SlotError>;

/// Slot storage failure.
#[derive(Debug)]
pub enum SlotError {
    /// Write rejected because the store would exceed its byte quota.
    QuotaExceeded { needed: usize, limit: usize },
    Db(DbError),
    /// Backend cannot be used at all.
    Unavailable(String),
}

impl SlotError {
    /// Returns whether this is the capacity-exceeded failure.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl Display for SlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { needed, limit } => {
                write!(f, "storage quota exceeded: need {needed} bytes, limit {limit}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
        }
    }
}

impl Error for SlotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SlotError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SlotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Single-actor key-value store holding string slots.
pub trait SlotRepository {
    /// Reads one slot; `None` when absent.
    fn get(&self, key: &str) -> SlotResult<Option<String>>;
    /// Creates or replaces one slot.
    fn set(&self, key: &str, value: &str) -> SlotResult<()>;
    /// Deletes one slot. Missing keys are not an error.
    fn remove(&self, key: &str) -> SlotResult<()>;
    /// Deletes every slot.
    fn clear(&self) -> SlotResult<()>;
}

impl<R: SlotRepository + ?Sized> SlotRepository for &R {
    fn get(&self, key: &str) -> SlotResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> SlotResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> SlotResult<()> {
        (**self).remove(key)
    }

    fn clear(&self) -> SlotResult<()> {
        (**self).clear()
    }
}

fn check_quota(quota: Option<usize>, other_bytes: usize, key: &str, value: &str) -> SlotResult<()> {
    let Some(limit) = quota else {
        return Ok(());
    };
    let needed = other_bytes + key.len() + value.len();
    if needed > limit {
        debug!("event=slot_set module=repo status=quota_exceeded needed={needed} limit={limit}");
        return Err(SlotError::QuotaExceeded { needed, limit });
    }
    Ok(())
}

/// SQLite-backed slot repository over a migrated connection.
pub struct SqliteSlotRepository<'conn> {
    conn: &'conn Connection,
    quota_bytes: Option<usize>,
}

impl<'conn> SqliteSlotRepository<'conn> {
    /// Wraps a connection returned by `db::open_db*`; no quota.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            quota_bytes: None,
        }
    }

    /// Sets the total byte budget across all slots (keys + values).
    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    fn bytes_excluding(&self, key: &str) -> SlotResult<usize> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0)
             FROM slots
             WHERE key <> ?1;",
            params![key],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(used).unwrap_or(usize::MAX))
    }
}

impl SlotRepository for SqliteSlotRepository<'_> {
    fn get(&self, key: &str) -> SlotResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM slots WHERE key = ?1;",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> SlotResult<()> {
        if self.quota_bytes.is_some() {
            check_quota(self.quota_bytes, self.bytes_excluding(key)?, key, value)?;
        }

        self.conn.execute(
            "INSERT INTO slots (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> SlotResult<()> {
        self.conn
            .execute("DELETE FROM slots WHERE key = ?1;", params![key])?;
        Ok(())
    }

    fn clear(&self) -> SlotResult<()> {
        self.conn.execute("DELETE FROM slots;", [])?;
        Ok(())
    }
}

/// Process-local slot repository.
#[derive(Debug, Default)]
pub struct MemorySlotRepository {
    slots: RefCell<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemorySlotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty repository with a total byte budget.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            slots: RefCell::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Number of stored slots.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl SlotRepository for MemorySlotRepository {
    fn get(&self, key: &str) -> SlotResult<Option<String>> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SlotResult<()> {
        let other_bytes = self
            .slots
            .borrow()
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, stored)| existing.len() + stored.len())
            .sum();
        check_quota(self.quota_bytes, other_bytes, key, value)?;

        self.slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SlotResult<()> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> SlotResult<()> {
        self.slots.borrow_mut().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemorySlotRepository, SlotError, SlotRepository, SqliteSlotRepository};
    use crate::db::open_db_in_memory;

    #[test]
    fn memory_quota_counts_keys_and_values() {
        let repo = MemorySlotRepository::with_quota(10);
        repo.set("k", "123456789").expect("write within quota");

        let err = repo.set("other", "x").unwrap_err();
        assert!(matches!(err, SlotError::QuotaExceeded { needed: 16, limit: 10 }));
        assert_eq!(repo.get("k").expect("memory read").as_deref(), Some("123456789"));
    }

    #[test]
    fn memory_overwrite_does_not_double_count_existing_slot() {
        let repo = MemorySlotRepository::with_quota(10);
        repo.set("k", "123456789").expect("write within quota");
        repo.set("k", "987654321").expect("overwrite within quota");
        assert_eq!(repo.get("k").expect("memory read").as_deref(), Some("987654321"));
    }

    #[test]
    fn sqlite_set_get_remove_clear() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let repo = SqliteSlotRepository::new(&conn);

        assert_eq!(repo.get("a").expect("read missing slot"), None);
        repo.set("a", "1").expect("insert slot");
        repo.set("a", "2").expect("overwrite slot");
        repo.set("b", "3").expect("insert second slot");
        assert_eq!(repo.get("a").expect("read slot").as_deref(), Some("2"));

        repo.remove("a").expect("remove slot");
        repo.remove("a").expect("removing a missing slot is not an error");
        assert_eq!(repo.get("a").expect("read removed slot"), None);

        repo.clear().expect("clear slots");
        assert_eq!(repo.get("b").expect("read cleared slot"), None);
    }

    #[test]
    fn sqlite_quota_rejects_oversized_write() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let repo = SqliteSlotRepository::new(&conn).with_quota(Some(8));

        repo.set("k", "1234").expect("write within quota");
        let err = repo.set("k2", "123456").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(repo.get("k2").expect("rejected write leaves no slot"), None);
    }
}
