//! Domain model for the notes list.
//!
//! # Responsibility
//! - Define the value records produced by storage reads.
//!
//! # Invariants
//! - Records are rebuilt from row data on every read and never mutated.

pub mod note;
