//! SQLite storage bootstrap.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the notes store.
//! - Ensure the `notes` table exists before any read runs.
//!
//! # Invariants
//! - Schema bootstrap is idempotent; reopening an existing store is a no-op.
//! - Raw `rusqlite` errors never cross the repository boundary unwrapped.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{ensure_schema, open_db, open_db_in_memory};

/// Name of the table every note read targets.
pub const NOTES_TABLE: &str = "notes";

pub type DbResult<T> = Result<T, DbError>;

/// Lower-level storage failure.
#[derive(Debug)]
pub enum DbError {
    /// SQLite reported an error (I/O, query, type conversion).
    Sqlite(rusqlite::Error),
    /// The blocking storage task panicked or was aborted before finishing.
    TaskFailed(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::TaskFailed(details) => write!(f, "storage task failed: {details}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::TaskFailed(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
