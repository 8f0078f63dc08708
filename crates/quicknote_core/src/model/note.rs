//! Note value record.
//!
//! # Responsibility
//! - Carry one `notes` row as an immutable value.
//!
//! # Invariants
//! - `id` is assigned by storage and unique within the `notes` table.
//! - `timestamp` is the list sort key (epoch milliseconds, newest first).

use serde::{Deserialize, Serialize};

/// Storage-assigned identifier of a note row.
pub type NoteId = i64;

/// One note as read from the `notes` table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    /// Unique row id.
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

impl Note {
    /// Builds a note from already-decoded column values.
    pub fn new(
        id: NoteId,
        title: impl Into<String>,
        content: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            timestamp,
        }
    }
}
