//! Read-side data access for notes.
//!
//! # Responsibility
//! - `note_dao`: run the notes query and decode rows.
//! - `note_repo`: expose reads as a stream presentation code subscribes to.
//!
//! # Invariants
//! - Callers never see raw `rusqlite` errors; failures arrive as
//!   `NoteStoreError`.

pub mod note_dao;
pub mod note_repo;
