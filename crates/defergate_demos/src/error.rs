//! Error types for the demo procedures.

use std::io;
use std::path::PathBuf;

use defergate_frame::FrameError;

/// Errors produced by the demo procedures.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// A file could not be opened. Files opened before it were closed.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        /// The file that failed to open.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
        /// Files closed by the `ret` gate before returning, in closing order.
        closed: Vec<PathBuf>,
    },
    /// A file was opened but its first line could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The file that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A frame operation failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        /// Worker index.
        worker: usize,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A worker thread panicked.
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// Worker index.
        worker: usize,
    },
    /// Mutexes were still held when the controlling frame ended.
    #[error("{0} mutex(es) still locked at teardown")]
    LeakedLocks(usize),
    /// The race configuration is unusable.
    #[error("invalid race configuration: {0}")]
    InvalidConfig(&'static str),
}
