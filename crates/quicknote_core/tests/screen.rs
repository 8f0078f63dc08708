use futures::channel::mpsc;
use futures::StreamExt;
use quicknote_core::db::open_db_in_memory;
use quicknote_core::{
    Note, NoteDao, NoteRepository, NoteSource, NoteStoreError, NoteStoreResult, NoteStream,
    NotesPhase, NotesScreen, NotesView,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct RecordingView {
    lists: Vec<Vec<Note>>,
    errors: Vec<String>,
}

impl NotesView for RecordingView {
    fn submit_list(&mut self, notes: &[Note]) {
        self.lists.push(notes.to_vec());
    }

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

struct ChannelSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<NoteStoreResult<Vec<Note>>>>>,
}

impl NoteSource for ChannelSource {
    fn note_snapshots(&self, cancel: CancellationToken) -> NoteStream {
        match self.rx.lock().unwrap().take() {
            Some(rx) => Box::pin(rx.take_until(cancel.cancelled_owned())),
            None => Box::pin(futures::stream::empty()),
        }
    }
}

#[tokio::test]
async fn render_loaded_draws_store_list_once() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO notes (title, content, timestamp) VALUES ('old', 'a', 1);
         INSERT INTO notes (title, content, timestamp) VALUES ('new', 'b', 2);",
    )
    .unwrap();
    let repo = Arc::new(NoteRepository::new(NoteDao::new(conn)));
    let mut screen = NotesScreen::open(repo);
    let mut view = RecordingView::default();

    let phase = screen.render_loaded(&mut view).await;

    assert_eq!(phase, NotesPhase::Loaded);
    assert_eq!(view.lists.len(), 1);
    let titles: Vec<&str> = view.lists[0].iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["new", "old"]);
    assert!(view.errors.is_empty());
    screen.close().await;
}

#[tokio::test]
async fn render_loaded_shows_error_without_a_list() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE notes;").unwrap();
    let repo = Arc::new(NoteRepository::new(NoteDao::new(conn)));
    let mut screen = NotesScreen::open(repo);
    let mut view = RecordingView::default();

    let phase = screen.render_loaded(&mut view).await;

    assert_eq!(phase, NotesPhase::EmptyWithError);
    assert!(view.lists.is_empty());
    assert_eq!(view.errors.len(), 1);
    assert!(view.errors[0].starts_with("Failed to load notes:"));
}

#[tokio::test]
async fn observe_pushes_each_change_until_stopped() {
    let (tx, rx) = mpsc::unbounded();
    let source = Arc::new(ChannelSource {
        rx: Mutex::new(Some(rx)),
    });
    let screen = NotesScreen::open(source);
    let mut view = RecordingView::default();
    let stop = CancellationToken::new();

    let driver = async {
        tx.unbounded_send(Ok(vec![Note::new(1, "A", "B", 100)]))
            .unwrap();
        let mut notes_rx = screen.holder().subscribe_notes();
        notes_rx.wait_for(|state| state.is_loaded()).await.unwrap();
        tx.unbounded_send(Err(NoteStoreError::ColumnNotFound { column: "id" }))
            .unwrap();
        let mut errors_rx = screen.holder().subscribe_errors();
        errors_rx.wait_for(|slot| slot.is_some()).await.unwrap();
        // Give the observer a turn to draw the error before stopping.
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.cancel();
    };

    timeout(
        Duration::from_secs(5),
        futures::future::join(screen.observe(&mut view, stop.clone()), driver),
    )
    .await
    .expect("observer should stop");

    assert_eq!(view.lists.last(), Some(&vec![Note::new(1, "A", "B", 100)]));
    assert_eq!(view.errors.len(), 1);
    assert!(view.errors[0].contains("`id`"));
}

#[tokio::test]
async fn refresh_through_screen_redraws_new_rows() {
    let conn = open_db_in_memory().unwrap();
    let dao = NoteDao::new(conn);
    let repo = Arc::new(NoteRepository::new(dao.clone()));
    let mut screen = NotesScreen::open(repo);
    let mut view = RecordingView::default();

    screen.render_loaded(&mut view).await;
    assert_eq!(view.lists, vec![Vec::<Note>::new()]);

    dao.connection()
        .lock()
        .unwrap()
        .execute(
            "INSERT INTO notes (title, content, timestamp) VALUES ('added', 'x', 9);",
            [],
        )
        .unwrap();
    screen.holder_mut().refresh().await;
    screen.render_loaded(&mut view).await;

    assert_eq!(view.lists.len(), 2);
    assert_eq!(view.lists[1][0].title, "added");
}
