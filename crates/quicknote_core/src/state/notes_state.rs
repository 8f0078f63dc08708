//! Presentation state holder for the notes list.
//!
//! # Responsibility
//! - Subscribe to a `NoteSource` for the holder's lifetime.
//! - Publish the latest successful snapshot to any number of observers.
//! - Report read failures on a separate error channel.
//!
//! # Invariants
//! - Only the collection task writes state; observers read `Arc` snapshots,
//!   so they see either the previous or the next complete list.
//! - A failure never clears previously published notes.
//! - A cancelled collection writes no state, and `close`/`refresh` return
//!   only after the source stream has ended, so its read is finished.

use crate::model::note::Note;
use crate::repo::note_dao::{NoteStoreError, NoteStoreResult};
use crate::repo::note_repo::{NoteSource, NoteStream};
use futures::StreamExt;
use log::{debug, error};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Snapshot of the notes list as last published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotesState {
    notes: Arc<Vec<Note>>,
    loaded: bool,
}

impl NotesState {
    fn loaded(notes: Vec<Note>) -> Self {
        Self {
            notes: Arc::new(notes),
            loaded: true,
        }
    }

    /// Notes of the most recent successful read, newest first.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Shared handle to the snapshot list.
    pub fn shared_notes(&self) -> Arc<Vec<Note>> {
        Arc::clone(&self.notes)
    }

    /// Whether at least one read has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

/// User-facing failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationError {
    message: String,
}

impl PresentationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&NoteStoreError> for PresentationError {
    fn from(value: &NoteStoreError) -> Self {
        Self::new(format!("Failed to load notes: {value}"))
    }
}

impl Display for PresentationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for PresentationError {}

/// Holder state as seen by the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesPhase {
    /// Nothing read yet, no failure reported.
    Empty,
    /// A read succeeded and no failure is reported.
    Loaded,
    /// A failure was reported before any read succeeded.
    EmptyWithError,
    /// A failure was reported; the last successful list is still held.
    LoadedWithError,
}

type ErrorSlot = Option<PresentationError>;

struct Collector {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the notes list published to the UI.
///
/// Dropping the holder cancels its collection task.
pub struct NotesStateHolder {
    source: Arc<dyn NoteSource>,
    state_tx: Arc<watch::Sender<NotesState>>,
    error_tx: Arc<watch::Sender<ErrorSlot>>,
    lifetime: CancellationToken,
    collector: Option<Collector>,
}

impl NotesStateHolder {
    /// Creates the holder and starts collecting from `source` immediately.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn new(source: Arc<dyn NoteSource>) -> Self {
        let (state_tx, _) = watch::channel(NotesState::default());
        let (error_tx, _) = watch::channel(None);
        let mut holder = Self {
            source,
            state_tx: Arc::new(state_tx),
            error_tx: Arc::new(error_tx),
            lifetime: CancellationToken::new(),
            collector: None,
        };
        holder.start_collecting();
        holder
    }

    /// Latest published snapshot.
    pub fn current(&self) -> NotesState {
        self.state_tx.borrow().clone()
    }

    /// Last reported failure, if any.
    pub fn last_error(&self) -> Option<PresentationError> {
        self.error_tx.borrow().clone()
    }

    /// Current state machine position.
    ///
    /// The snapshot borrow is held while the error slot is read, so the pair
    /// was current at the same instant.
    pub fn phase(&self) -> NotesPhase {
        let state = self.state_tx.borrow();
        let failed = self.error_tx.borrow().is_some();
        match (state.is_loaded(), failed) {
            (false, false) => NotesPhase::Empty,
            (true, false) => NotesPhase::Loaded,
            (false, true) => NotesPhase::EmptyWithError,
            (true, true) => NotesPhase::LoadedWithError,
        }
    }

    /// Observes snapshot replacements.
    pub fn subscribe_notes(&self) -> watch::Receiver<NotesState> {
        self.state_tx.subscribe()
    }

    /// Observes reported failures.
    pub fn subscribe_errors(&self) -> watch::Receiver<ErrorSlot> {
        self.error_tx.subscribe()
    }

    /// Resubscribes to the source after stopping the current collection.
    ///
    /// Held notes stay visible until the new read succeeds; the last reported
    /// failure is cleared.
    pub async fn refresh(&mut self) {
        self.stop_collecting().await;
        if self.lifetime.is_cancelled() {
            return;
        }
        self.error_tx.send_replace(None);
        self.start_collecting();
    }

    /// Waits until the current collection task finishes.
    ///
    /// Returns immediately when nothing is collecting.
    pub async fn wait_idle(&mut self) {
        if let Some(collector) = self.collector.take() {
            join_collector(collector).await;
        }
    }

    /// Cancels collection and waits for the task to stop.
    pub async fn close(&mut self) {
        self.lifetime.cancel();
        self.stop_collecting().await;
    }

    fn start_collecting(&mut self) {
        let cancel = self.lifetime.child_token();
        let stream = self.source.note_snapshots(cancel.clone());
        let task = tokio::spawn(collect(
            stream,
            cancel.clone(),
            Arc::clone(&self.state_tx),
            Arc::clone(&self.error_tx),
        ));
        self.collector = Some(Collector { cancel, task });
    }

    async fn stop_collecting(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.cancel.cancel();
            join_collector(collector).await;
        }
    }
}

async fn join_collector(collector: Collector) {
    if let Err(err) = collector.task.await {
        error!(
            "event=notes_state module=state status=error error_code=collector_failed error={err}"
        );
    }
}

impl Drop for NotesStateHolder {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

async fn collect(
    mut stream: NoteStream,
    cancel: CancellationToken,
    state_tx: Arc<watch::Sender<NotesState>>,
    error_tx: Arc<watch::Sender<ErrorSlot>>,
) {
    loop {
        let next: Option<NoteStoreResult<Vec<Note>>> = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                drain_cancelled(&mut stream).await;
                break;
            }
            next = stream.next() => next,
        };

        match next {
            None => break,
            Some(Ok(notes)) => {
                debug!(
                    "event=notes_state module=state status=ok count={}",
                    notes.len()
                );
                state_tx.send_replace(NotesState::loaded(notes));
            }
            Some(Err(NoteStoreError::Cancelled)) => break,
            Some(Err(err)) => {
                error_tx.send_replace(Some(PresentationError::from(&err)));
            }
        }
    }
}

/// Polls a cancelled stream to its end so the source finishes its own
/// cancel path (statement interrupted, blocking read joined). Late items are
/// discarded.
async fn drain_cancelled(stream: &mut NoteStream) {
    let mut discarded = 0usize;
    while stream.next().await.is_some() {
        discarded += 1;
    }
    debug!("event=notes_state module=state status=cancelled discarded={discarded}");
}

#[cfg(test)]
mod tests {
    use super::{NotesState, PresentationError};
    use crate::db::DbError;
    use crate::model::note::Note;
    use crate::repo::note_dao::NoteStoreError;

    #[test]
    fn default_state_is_not_loaded_and_empty() {
        let state = NotesState::default();
        assert!(!state.is_loaded());
        assert!(state.notes().is_empty());
    }

    #[test]
    fn loaded_state_with_no_rows_is_still_loaded() {
        let state = NotesState::loaded(Vec::new());
        assert!(state.is_loaded());
        assert!(state.notes().is_empty());
    }

    #[test]
    fn snapshots_share_the_same_list() {
        let state = NotesState::loaded(vec![Note::new(1, "A", "B", 100)]);
        let copy = state.clone();
        assert!(std::sync::Arc::ptr_eq(
            &state.shared_notes(),
            &copy.shared_notes()
        ));
    }

    #[test]
    fn presentation_error_prefixes_store_failure() {
        let err = NoteStoreError::DatabaseAccess(DbError::TaskFailed("boom".to_string()));
        let presented = PresentationError::from(&err);
        assert!(presented.message().starts_with("Failed to load notes: "));
        assert!(presented.message().contains("boom"));
    }
}
