//! Open several files, read a line from each, close them on `ret`.
//!
//! Each close hook is registered immediately after its file opens, so an open
//! failure part way through closes exactly the files that were opened, newest
//! first.

use core::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use defergate_frame::{Frame, FrameConfig, gates, hook};
use tracing::{debug, info};

use crate::error::DemoError;

/// One step of the files procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// The file was opened.
    Opened(PathBuf),
    /// The first line of the file was read, without its line terminator.
    Read {
        /// The file read.
        path: PathBuf,
        /// The line content.
        line: String,
    },
    /// The file was closed by the `ret` gate.
    Closed(PathBuf),
}

/// Ordered trace of a successful files run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesReport {
    events: Vec<FileEvent>,
}

impl FilesReport {
    /// Returns every event in the order it happened.
    #[must_use]
    pub fn events(&self) -> &[FileEvent] {
        &self.events
    }

    /// Returns the closed files in closing order.
    #[must_use]
    pub fn closed(&self) -> Vec<&Path> {
        self.events
            .iter()
            .filter_map(|event| match event {
                FileEvent::Closed(path) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }

    /// Returns the first line read from each file, in opening order.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                FileEvent::Read { line, .. } => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn closed_paths(events: &[FileEvent]) -> Vec<PathBuf> {
    events
        .iter()
        .filter_map(|event| match event {
            FileEvent::Closed(path) => Some(path.clone()),
            _ => None,
        })
        .collect()
}

/// Opens every path in order, reads the first line of each, then closes them
/// in reverse opening order.
///
/// # Errors
///
/// Returns [`DemoError::Open`] if a file cannot be opened. Every file opened
/// before it has been closed by then, and the error lists them in closing
/// order. Returns [`DemoError::Read`] if a first line cannot be read, after
/// closing everything that was opened.
pub fn run_files(paths: &[PathBuf]) -> Result<FilesReport, DemoError> {
    let events: RefCell<Vec<FileEvent>> = RefCell::new(Vec::new());
    let open: RefCell<Vec<Option<BufReader<File>>>> = RefCell::new(Vec::with_capacity(paths.len()));

    let frame = Frame::with_config(FrameConfig::new().with_name("files"));
    gates!(frame; ret);

    for (slot, path) in paths.iter().enumerate() {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(source) => {
                debug!(path = %path.display(), "open failed, jumping to ret");
                frame.finish(ret)?;
                let closed = closed_paths(&events.borrow());
                return Err(DemoError::Open {
                    path: path.clone(),
                    source,
                    closed,
                });
            }
        };
        open.borrow_mut().push(Some(BufReader::new(file)));
        events.borrow_mut().push(FileEvent::Opened(path.clone()));
        info!(path = %path.display(), "opened file");

        let (events, open) = (&events, &open);
        hook!(frame, ret => move {
            open.borrow_mut()[slot].take();
            events.borrow_mut().push(FileEvent::Closed(path.clone()));
            info!(path = %path.display(), "closed file");
        })?;
    }

    for (slot, path) in paths.iter().enumerate() {
        let read = {
            let mut open = open.borrow_mut();
            let mut line = String::new();
            match open[slot].as_mut() {
                Some(reader) => reader.read_line(&mut line).map(|_| line),
                None => Ok(line),
            }
        };
        match read {
            Ok(line) => {
                let line = line.trim_end_matches(['\r', '\n']).to_owned();
                info!(path = %path.display(), content = %line, "read from file");
                events.borrow_mut().push(FileEvent::Read {
                    path: path.clone(),
                    line,
                });
            }
            Err(source) => {
                frame.finish(ret)?;
                return Err(DemoError::Read {
                    path: path.clone(),
                    source,
                });
            }
        }
    }

    frame.finish(ret)?;
    Ok(FilesReport {
        events: events.into_inner(),
    })
}
