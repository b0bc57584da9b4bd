//! Slot database: one SQLite file holding the `slots` key-value table.
//!
//! Connections come out of `open_db`/`open_db_in_memory` already migrated,
//! so `SqliteSlotRepository` can assume the table exists. A file written by
//! a newer build is refused rather than downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// `PRAGMA user_version` is ahead of the newest known migration.
    SchemaTooNew { found: u32, supported: u32 },
}

impl DbError {
    /// Whether the slot file belongs to a newer build.
    pub fn is_schema_too_new(&self) -> bool {
        matches!(self, Self::SchemaTooNew { .. })
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "slot database error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "slot file has schema v{found}; this build reads up to v{supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::error::Error;

    #[test]
    fn schema_error_names_both_versions() {
        let err = DbError::SchemaTooNew {
            found: 7,
            supported: 1,
        };
        assert!(err.is_schema_too_new());
        assert!(err.source().is_none());
        assert_eq!(
            err.to_string(),
            "slot file has schema v7; this build reads up to v1"
        );
    }
}
