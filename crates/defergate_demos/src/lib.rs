//! Demonstration procedures built on defergate frames.
//!
//! Two procedures show the two common gate shapes:
//!
//! - [`files::run_files`] opens a sequence of files and closes them on a
//!   single `ret` gate, in reverse opening order, including on early exit.
//! - [`race::run_race`] runs workers that grab a set of mutexes in opposite
//!   orders. Each worker has a `retry` gate that releases a partial
//!   acquisition using the live loop index, and a `ret` gate that releases
//!   everything.
//!
//! ```text
//! worker k:  try_lock(0..n) ──busy──▶ retry: release [0..i), back off ─┐
//!                 ▲                                                   │
//!                 └───────────────────── restart at 0 ◀───────────────┘
//!                 │ all held
//!                 ▼
//!            ret: release all
//! ```

mod error;
pub mod files;
pub mod race;

pub use error::DemoError;
pub use files::{FileEvent, FilesReport, run_files};
pub use race::{RaceConfig, RaceReport, WorkerReport, access_index, run_race};
