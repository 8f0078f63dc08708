//! Terminal notes screen.
//!
//! # Responsibility
//! - Open a notes database and render its list once, newest first.
//! - Wire logging, storage, repository and state holder end to end.

use clap::Parser;
use log::error;
use quicknote_core::db::open_db;
use quicknote_core::{
    core_version, default_log_level, init_logging, Note, NoteDao, NoteRepository, NotesPhase,
    NotesScreen, NotesView,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "quicknote", version = core_version())]
#[command(about = "List notes from a QuickNote database, newest first", long_about = None)]
struct Cli {
    /// Path of the SQLite notes database.
    #[arg(long, env = "QUICKNOTE_DB")]
    db: PathBuf,
    /// trace|debug|info|warn|error
    #[arg(long, env = "QUICKNOTE_LOG_LEVEL")]
    log_level: Option<String>,
    /// Absolute directory for rolling log files; file logging is off without it.
    #[arg(long, env = "QUICKNOTE_LOG_DIR")]
    log_dir: Option<PathBuf>,
    /// Print the list as JSON.
    #[arg(long)]
    json: bool,
}

struct TerminalView {
    json: bool,
    failed: bool,
}

impl NotesView for TerminalView {
    fn submit_list(&mut self, notes: &[Note]) {
        let mut out = std::io::stdout().lock();
        let written = if self.json {
            serde_json::to_writer_pretty(&mut out, notes)
                .map_err(std::io::Error::from)
                .and_then(|()| writeln!(out))
        } else if notes.is_empty() {
            writeln!(out, "(no notes)")
        } else {
            notes.iter().try_for_each(|note| {
                writeln!(
                    out,
                    "{}  {}\n    {}",
                    note.timestamp, note.title, note.content
                )
            })
        };
        if let Err(err) = written {
            eprintln!("Error: failed to write notes: {err}");
            self.failed = true;
        }
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("Error: {message}");
        self.failed = true;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_ref() {
        let level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().as_str().to_string());
        if let Err(err) = init_logging(&level, &log_dir.to_string_lossy()) {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    }

    let conn = match open_db(&cli.db) {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=cli_open module=cli status=error error={err}");
            eprintln!("Error: cannot open `{}`: {err}", cli.db.display());
            return ExitCode::FAILURE;
        }
    };

    let repo = Arc::new(NoteRepository::new(NoteDao::new(conn)));
    let mut screen = NotesScreen::open(repo);
    let mut view = TerminalView {
        json: cli.json,
        failed: false,
    };
    let phase = screen.render_loaded(&mut view).await;
    screen.close().await;

    match phase {
        NotesPhase::Loaded if !view.failed => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
