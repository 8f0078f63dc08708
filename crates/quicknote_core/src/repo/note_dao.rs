//! Store reader for the `notes` table.
//!
//! # Responsibility
//! - Read every note, newest first, in one query.
//! - Decode rows by column name into `Note` values.
//! - Report read failures once through the injected `LogSink`.
//!
//! # Invariants
//! - Column names are resolved before the first row is decoded; a missing
//!   column yields `ColumnNotFound` and no notes.
//! - A read either returns the complete ordered list or an error, never a
//!   partial list.
//! - The statement and its cursor never outlive the call that created them,
//!   including on cancellation.

use crate::db::{DbError, NOTES_TABLE};
use crate::logging::{FacadeLogSink, LogSink};
use crate::model::note::Note;
use log::Level;
use rusqlite::{Connection, ErrorCode, InterruptHandle, Row, Statement};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

pub const COLUMN_ID: &str = "id";
pub const COLUMN_TITLE: &str = "title";
pub const COLUMN_CONTENT: &str = "content";
pub const COLUMN_TIMESTAMP: &str = "timestamp";

// `id DESC` only breaks timestamp ties; it keeps equal-timestamp order stable.
const SELECT_ALL_NOTES_SQL: &str = "SELECT * FROM notes ORDER BY timestamp DESC, id DESC;";

pub type NoteStoreResult<T> = Result<T, NoteStoreError>;

/// Failure of a notes read.
#[derive(Debug)]
pub enum NoteStoreError {
    /// An expected column is absent from the result schema.
    ColumnNotFound { column: &'static str },
    /// Storage failed underneath the read.
    DatabaseAccess(DbError),
    /// The read was abandoned through its cancellation token.
    Cancelled,
}

impl Display for NoteStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColumnNotFound { column } => {
                write!(f, "column `{column}` not found in `{NOTES_TABLE}` result")
            }
            Self::DatabaseAccess(err) => write!(f, "failed to get notes: {err}"),
            Self::Cancelled => write!(f, "notes read cancelled"),
        }
    }
}

impl Error for NoteStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DatabaseAccess(err) => Some(err),
            Self::ColumnNotFound { .. } | Self::Cancelled => None,
        }
    }
}

impl From<DbError> for NoteStoreError {
    fn from(value: DbError) -> Self {
        Self::DatabaseAccess(value)
    }
}

impl From<rusqlite::Error> for NoteStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::DatabaseAccess(DbError::Sqlite(value))
    }
}

/// Connection shared between the DAO and the blocking tasks it spawns.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Reads notes from a SQLite connection.
///
/// Cloning is cheap; clones share the same connection and log sink.
#[derive(Clone)]
pub struct NoteDao {
    conn: SharedConnection,
    interrupt: Arc<InterruptHandle>,
    log_sink: Arc<dyn LogSink>,
}

impl NoteDao {
    /// Wraps a connection whose `notes` table is ready, logging to the `log` facade.
    pub fn new(conn: Connection) -> Self {
        Self::with_log_sink(conn, Arc::new(FacadeLogSink))
    }

    /// Wraps a connection and reports read failures to `log_sink`.
    pub fn with_log_sink(conn: Connection, log_sink: Arc<dyn LogSink>) -> Self {
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            log_sink,
        }
    }

    /// Returns the shared connection handle.
    pub fn connection(&self) -> SharedConnection {
        Arc::clone(&self.conn)
    }

    /// Reads all notes ordered by `timestamp` descending.
    ///
    /// Storage work runs on the blocking pool. When `cancel` fires, the
    /// running statement is interrupted and the blocking task is joined
    /// before `Cancelled` is returned, so no cursor is left open.
    ///
    /// # Errors
    /// - `ColumnNotFound` when the result schema lacks a `notes` column.
    /// - `DatabaseAccess` for any storage failure.
    /// - `Cancelled` when `cancel` fired before the read completed.
    pub async fn get_all_notes(&self, cancel: &CancellationToken) -> NoteStoreResult<Vec<Note>> {
        if cancel.is_cancelled() {
            return Err(NoteStoreError::Cancelled);
        }

        let conn = Arc::clone(&self.conn);
        let token = cancel.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            let guard = lock_connection(&conn);
            read_notes(&guard, &token)
        });

        // Covers callers that drop this future mid-read instead of cancelling.
        let mut interrupt_guard = InterruptOnDrop::new(&self.interrupt);
        let joined = tokio::select! {
            joined = &mut task => joined,
            () = cancel.cancelled() => {
                self.interrupt.interrupt();
                // Drain the task so its statement is dropped before returning.
                let _ = task.await;
                interrupt_guard.disarm();
                return Err(NoteStoreError::Cancelled);
            }
        };
        interrupt_guard.disarm();

        let result = match joined {
            Ok(result) => result,
            Err(join_err) => Err(NoteStoreError::DatabaseAccess(DbError::TaskFailed(
                join_err.to_string(),
            ))),
        };
        self.finish_read(result, cancel)
    }

    /// Blocking variant of [`NoteDao::get_all_notes`] for synchronous callers.
    ///
    /// # Errors
    /// - `ColumnNotFound` when the result schema lacks a `notes` column.
    /// - `DatabaseAccess` for any storage failure.
    pub fn read_all_notes(&self) -> NoteStoreResult<Vec<Note>> {
        let never = CancellationToken::new();
        let result = {
            let guard = lock_connection(&self.conn);
            read_notes(&guard, &never)
        };
        self.finish_read(result, &never)
    }

    fn finish_read(
        &self,
        result: NoteStoreResult<Vec<Note>>,
        cancel: &CancellationToken,
    ) -> NoteStoreResult<Vec<Note>> {
        match result {
            Ok(notes) => Ok(notes),
            Err(NoteStoreError::Cancelled) => Err(NoteStoreError::Cancelled),
            Err(err) if cancel.is_cancelled() && is_interrupted(&err) => {
                Err(NoteStoreError::Cancelled)
            }
            Err(err) => {
                self.log_sink.log(
                    Level::Error,
                    &format!(
                        "event=notes_read module=repo status=error error_code={} error={err}",
                        error_code(&err)
                    ),
                );
                Err(err)
            }
        }
    }
}

/// Column positions of the `notes` fields in one result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteColumns {
    id: usize,
    title: usize,
    content: usize,
    timestamp: usize,
}

impl NoteColumns {
    /// Looks up every note column by name in the prepared statement.
    ///
    /// # Errors
    /// Returns `ColumnNotFound` naming the first absent column.
    pub fn resolve(stmt: &Statement<'_>) -> NoteStoreResult<Self> {
        let index_of = |column: &'static str| {
            stmt.column_index(column)
                .map_err(|_| NoteStoreError::ColumnNotFound { column })
        };
        Ok(Self {
            id: index_of(COLUMN_ID)?,
            title: index_of(COLUMN_TITLE)?,
            content: index_of(COLUMN_CONTENT)?,
            timestamp: index_of(COLUMN_TIMESTAMP)?,
        })
    }

    /// Decodes one row into a `Note`.
    pub fn decode(&self, row: &Row<'_>) -> rusqlite::Result<Note> {
        Ok(Note {
            id: row.get(self.id)?,
            title: row.get(self.title)?,
            content: row.get(self.content)?,
            timestamp: row.get(self.timestamp)?,
        })
    }
}

struct InterruptOnDrop<'a> {
    handle: &'a InterruptHandle,
    armed: bool,
}

impl<'a> InterruptOnDrop<'a> {
    fn new(handle: &'a InterruptHandle) -> Self {
        Self {
            handle,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InterruptOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.handle.interrupt();
        }
    }
}

fn read_notes(conn: &Connection, cancel: &CancellationToken) -> NoteStoreResult<Vec<Note>> {
    if cancel.is_cancelled() {
        return Err(NoteStoreError::Cancelled);
    }

    let mut stmt = conn.prepare(SELECT_ALL_NOTES_SQL)?;
    let columns = NoteColumns::resolve(&stmt)?;
    let mut rows = stmt.query([])?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        if cancel.is_cancelled() {
            return Err(NoteStoreError::Cancelled);
        }
        notes.push(columns.decode(row)?);
    }

    Ok(notes)
}

fn lock_connection(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    // Reads never leave the connection half-written, so a poisoned lock is usable.
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

// Only our own interrupt counts as cancellation; any other failure is reported.
fn is_interrupted(err: &NoteStoreError) -> bool {
    matches!(
        err,
        NoteStoreError::DatabaseAccess(DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
            if e.code == ErrorCode::OperationInterrupted
    )
}

fn error_code(err: &NoteStoreError) -> &'static str {
    match err {
        NoteStoreError::ColumnNotFound { .. } => "column_not_found",
        NoteStoreError::DatabaseAccess(DbError::Sqlite(_)) => "db_read_failed",
        NoteStoreError::DatabaseAccess(DbError::TaskFailed(_)) => "db_task_failed",
        NoteStoreError::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteColumns, NoteDao, NoteStoreError};
    use crate::db::DbError;
    use crate::logging::LogSink;
    use log::Level;
    use rusqlite::{ffi, Connection};
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct CountingSink {
        errors: Mutex<usize>,
    }

    impl LogSink for CountingSink {
        fn log(&self, level: Level, _message: &str) {
            if level == Level::Error {
                *self.errors.lock().unwrap() += 1;
            }
        }
    }

    fn cancelled_dao() -> (NoteDao, Arc<CountingSink>, CancellationToken) {
        let sink = Arc::new(CountingSink::default());
        let dao = NoteDao::with_log_sink(Connection::open_in_memory().unwrap(), sink.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        (dao, sink, cancel)
    }

    #[test]
    fn storage_failure_racing_a_cancel_is_still_logged() {
        let (dao, sink, cancel) = cancelled_dao();
        let failed = NoteStoreError::DatabaseAccess(DbError::Sqlite(rusqlite::Error::InvalidQuery));

        let err = dao.finish_read(Err(failed), &cancel).unwrap_err();

        assert!(matches!(err, NoteStoreError::DatabaseAccess(_)));
        assert_eq!(*sink.errors.lock().unwrap(), 1);
    }

    #[test]
    fn interrupted_statement_after_cancel_is_cancellation() {
        let (dao, sink, cancel) = cancelled_dao();
        let interrupted = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_INTERRUPT), None);

        let err = dao.finish_read(Err(interrupted.into()), &cancel).unwrap_err();

        assert!(matches!(err, NoteStoreError::Cancelled));
        assert_eq!(*sink.errors.lock().unwrap(), 0);
    }

    #[test]
    fn interrupted_statement_without_cancel_is_reported() {
        let (dao, sink, _) = cancelled_dao();
        let interrupted = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_INTERRUPT), None);

        let err = dao
            .finish_read(Err(interrupted.into()), &CancellationToken::new())
            .unwrap_err();

        assert!(matches!(err, NoteStoreError::DatabaseAccess(_)));
        assert_eq!(*sink.errors.lock().unwrap(), 1);
    }

    #[test]
    fn resolve_finds_columns_regardless_of_position() {
        let conn = Connection::open_in_memory().unwrap();
        let stmt = conn
            .prepare("SELECT 100 AS timestamp, 'B' AS content, 'A' AS title, 1 AS id;")
            .unwrap();
        let columns = NoteColumns::resolve(&stmt).unwrap();
        assert_eq!(
            columns,
            NoteColumns {
                id: 3,
                title: 2,
                content: 1,
                timestamp: 0,
            }
        );
    }

    #[test]
    fn resolve_reports_first_missing_column() {
        let conn = Connection::open_in_memory().unwrap();
        let stmt = conn
            .prepare("SELECT 1 AS id, 'A' AS title, 100 AS timestamp;")
            .unwrap();
        let err = NoteColumns::resolve(&stmt).unwrap_err();
        assert!(matches!(
            err,
            NoteStoreError::ColumnNotFound { column: "content" }
        ));
    }

    #[test]
    fn decode_builds_note_from_named_columns() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn
            .prepare("SELECT 'B' AS content, 1 AS id, 100 AS timestamp, 'A' AS title;")
            .unwrap();
        let columns = NoteColumns::resolve(&stmt).unwrap();
        let note = stmt
            .query_row([], |row| columns.decode(row))
            .unwrap();
        assert_eq!(note.id, 1);
        assert_eq!(note.title, "A");
        assert_eq!(note.content, "B");
        assert_eq!(note.timestamp, 100);
    }
}
