//! Tracing setup
//!
//! Diagnostics go to stderr under `RUST_LOG` (default `warn`). Every
//! session also writes a debug trace of model requests, responses, tool
//! usage and conversation state to `logs/llm_<timestamp>.log`, and appends
//! the same trace to the long-lived `logs/llm.log`.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Directory holding the debug traces
pub const LOG_DIR: &str = "logs";

/// Long-lived trace, appended across sessions
pub const PERMANENT_LOG: &str = "llm.log";

const FILE_FILTER: &str =
    "warn,assistant_core=debug,assistant_runtime=debug,assistant_tools=debug,assistant_cli=debug";

/// Open trace files for one session
#[derive(Debug)]
pub struct LogFiles {
    pub session_path: PathBuf,
    pub session: File,
    pub permanent: File,
}

/// File name of a session trace, e.g. `llm_20250101_120000.log`
pub fn session_log_name(timestamp: &str) -> String {
    format!("llm_{timestamp}.log")
}

/// Create `dir` if needed, truncate the session trace and open the
/// permanent trace for appending
pub fn open_log_files(dir: &Path, timestamp: &str) -> anyhow::Result<LogFiles> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let session_path = dir.join(session_log_name(timestamp));
    let session = File::create(&session_path)
        .with_context(|| format!("failed to create {}", session_path.display()))?;

    let permanent_path = dir.join(PERMANENT_LOG);
    let permanent = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&permanent_path)
        .with_context(|| format!("failed to open {}", permanent_path.display()))?;

    Ok(LogFiles {
        session_path,
        session,
        permanent,
    })
}

/// Install the global subscriber; returns the session trace path
pub fn init() -> anyhow::Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let files = open_log_files(Path::new(LOG_DIR), &timestamp)?;

    // stdout belongs to the chat
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let session = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(files.session))
        .with_filter(EnvFilter::new(FILE_FILTER));

    let permanent = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(files.permanent))
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::registry()
        .with(console)
        .with(session)
        .with(permanent)
        .init();

    Ok(files.session_path)
}
