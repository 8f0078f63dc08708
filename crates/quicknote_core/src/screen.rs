//! Rendering boundary and screen glue.
//!
//! # Responsibility
//! - Define `NotesView`, the surface that draws the list and error messages.
//! - Bind a `NotesStateHolder` to a view for the lifetime of a screen.
//!
//! # Invariants
//! - Views only receive complete snapshots.
//! - Closing the screen cancels the holder's collection task.

use crate::model::note::Note;
use crate::repo::note_repo::NoteSource;
use crate::state::notes_state::{NotesPhase, NotesStateHolder};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Rendering surface for the notes list.
pub trait NotesView {
    /// Replaces the displayed list.
    fn submit_list(&mut self, notes: &[Note]);
    /// Shows a user-facing failure message.
    fn show_error(&mut self, message: &str);
}

/// One notes screen: a state holder plus the view bound to it.
pub struct NotesScreen {
    holder: NotesStateHolder,
}

impl NotesScreen {
    /// Opens the screen and starts loading notes from `source`.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn open(source: Arc<dyn NoteSource>) -> Self {
        Self {
            holder: NotesStateHolder::new(source),
        }
    }

    pub fn holder(&self) -> &NotesStateHolder {
        &self.holder
    }

    pub fn holder_mut(&mut self) -> &mut NotesStateHolder {
        &mut self.holder
    }

    /// Waits for the pending load to finish, then draws the result once.
    pub async fn render_loaded(&mut self, view: &mut dyn NotesView) -> NotesPhase {
        self.holder.wait_idle().await;
        self.render_current(view);
        self.holder.phase()
    }

    /// Draws the currently held list and, if present, the last failure.
    pub fn render_current(&self, view: &mut dyn NotesView) {
        let state = self.holder.current();
        if state.is_loaded() {
            view.submit_list(state.notes());
        }
        if let Some(err) = self.holder.last_error() {
            view.show_error(err.message());
        }
    }

    /// Pushes every state and error change into `view` until `stop` fires.
    ///
    /// The current state is drawn first.
    pub async fn observe(&self, view: &mut dyn NotesView, stop: CancellationToken) {
        let mut notes_rx = self.holder.subscribe_notes();
        let mut errors_rx = self.holder.subscribe_errors();

        let initial = notes_rx.borrow_and_update().clone();
        if initial.is_loaded() {
            view.submit_list(initial.notes());
        }
        let initial_error = errors_rx.borrow_and_update().clone();
        if let Some(err) = initial_error {
            view.show_error(err.message());
        }

        loop {
            tokio::select! {
                () = stop.cancelled() => break,
                changed = notes_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = notes_rx.borrow_and_update().clone();
                    view.submit_list(state.notes());
                }
                changed = errors_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let reported = errors_rx.borrow_and_update().clone();
                    if let Some(err) = reported {
                        view.show_error(err.message());
                    }
                }
            }
        }
    }

    /// Tears the screen down, cancelling any in-flight load.
    pub async fn close(mut self) {
        self.holder.close().await;
    }
}
