//! Core read pipeline for QuickNote.
//! Storage reads, the snapshot stream and the presentation state live here.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod screen;
pub mod state;

pub use logging::{
    default_log_level, init_logging, logging_status, FacadeLogSink, LogLevel, LogSink,
    LoggingError,
};
pub use model::note::{Note, NoteId};
pub use repo::note_dao::{NoteColumns, NoteDao, NoteStoreError, NoteStoreResult};
pub use repo::note_repo::{NoteRepository, NoteSource, NoteStream};
pub use screen::{NotesScreen, NotesView};
pub use state::notes_state::{NotesPhase, NotesState, NotesStateHolder, PresentationError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
