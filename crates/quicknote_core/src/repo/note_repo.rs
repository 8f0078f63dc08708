//! Note repository: the store reader exposed as a stream of snapshots.
//!
//! # Responsibility
//! - Turn single-shot DAO reads into a subscribable `NoteStream`.
//! - Keep presentation code unaware of SQLite and of the DAO.
//!
//! # Invariants
//! - Errors pass through unchanged; a cancelled read ends the stream
//!   without yielding an item.
//! - Each item is a complete snapshot ordered newest first.

use crate::model::note::Note;
use crate::repo::note_dao::{NoteDao, NoteStoreError, NoteStoreResult};
use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Stream of complete note-list snapshots.
pub type NoteStream = Pin<Box<dyn Stream<Item = NoteStoreResult<Vec<Note>>> + Send>>;

/// Producer of note-list snapshots.
///
/// One-shot and live-updating producers share this interface. Once `cancel`
/// fires the stream must end after releasing whatever it holds; consumers keep
/// polling until it does.
pub trait NoteSource: Send + Sync {
    fn note_snapshots(&self, cancel: CancellationToken) -> NoteStream;
}

/// Repository backed by a [`NoteDao`].
#[derive(Clone)]
pub struct NoteRepository {
    dao: NoteDao,
}

impl NoteRepository {
    pub fn new(dao: NoteDao) -> Self {
        Self { dao }
    }

    /// Returns all notes once, newest first.
    ///
    /// # Errors
    /// Propagates the DAO error unchanged.
    pub async fn get_all_notes(&self, cancel: &CancellationToken) -> NoteStoreResult<Vec<Note>> {
        self.dao.get_all_notes(cancel).await
    }
}

impl NoteSource for NoteRepository {
    fn note_snapshots(&self, cancel: CancellationToken) -> NoteStream {
        let dao = self.dao.clone();
        Box::pin(async_stream::stream! {
            match dao.get_all_notes(&cancel).await {
                Err(NoteStoreError::Cancelled) => {}
                result => yield result,
            }
        })
    }
}
