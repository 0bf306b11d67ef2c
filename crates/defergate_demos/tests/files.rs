//! Files procedure tests.
//!
//! Tests covering reverse closing order and early exit on open failure.

use std::fs;
use std::path::PathBuf;

use defergate_demos::{DemoError, FileEvent, run_files};
use tempfile::TempDir;

fn write_files(dir: &TempDir, contents: &[(&str, &str)]) -> Vec<PathBuf> {
    contents
        .iter()
        .map(|(name, body)| {
            let path = dir.path().join(name);
            fs::write(&path, body).expect("write fixture");
            path
        })
        .collect()
}

/// Verifies that files close in reverse opening order after both reads.
#[test]
fn files_close_in_reverse_order() {
    let dir = TempDir::new().unwrap();
    let paths = write_files(&dir, &[("file1.txt", "first\nmore"), ("file2.txt", "second\r\n")]);

    let report = run_files(&paths).unwrap();

    assert_eq!(report.lines(), ["first", "second"]);
    assert_eq!(report.closed(), [paths[1].as_path(), paths[0].as_path()]);
    assert_eq!(
        report.events(),
        [
            FileEvent::Opened(paths[0].clone()),
            FileEvent::Opened(paths[1].clone()),
            FileEvent::Read {
                path: paths[0].clone(),
                line: "first".into(),
            },
            FileEvent::Read {
                path: paths[1].clone(),
                line: "second".into(),
            },
            FileEvent::Closed(paths[1].clone()),
            FileEvent::Closed(paths[0].clone()),
        ]
    );
}

/// Verifies that an empty file reads as an empty line.
#[test]
fn empty_file_reads_empty_line() {
    let dir = TempDir::new().unwrap();
    let paths = write_files(&dir, &[("empty.txt", "")]);

    let report = run_files(&paths).unwrap();
    assert_eq!(report.lines(), [""]);
}

/// Verifies that an open failure closes only the files opened before it.
#[test]
fn open_failure_closes_only_opened_files() {
    let dir = TempDir::new().unwrap();
    let mut paths = write_files(&dir, &[("a.txt", "a"), ("b.txt", "b")]);
    let missing = dir.path().join("missing.txt");
    paths.insert(2, missing.clone());
    paths.push(dir.path().join("never.txt"));

    let err = run_files(&paths).expect_err("missing file should fail");

    let DemoError::Open { path, closed, .. } = err else {
        panic!("expected Open error");
    };
    assert_eq!(path, missing);
    assert_eq!(closed, [paths[1].clone(), paths[0].clone()]);
}

/// Verifies that failing on the first file closes nothing.
#[test]
fn first_open_failure_closes_nothing() {
    let dir = TempDir::new().unwrap();
    let paths = vec![dir.path().join("missing.txt")];

    let err = run_files(&paths).expect_err("missing file should fail");

    assert!(err.to_string().starts_with("failed to open"));
    let DemoError::Open { closed, .. } = err else {
        panic!("expected Open error");
    };
    assert!(closed.is_empty());
}

/// Verifies that a read failure after a successful open surfaces as a read
/// error once every opened file has been closed.
#[cfg(unix)]
#[test]
fn read_failure_reports_read_error() {
    let dir = TempDir::new().unwrap();
    let mut paths = write_files(&dir, &[("a.txt", "a")]);
    let subdir = dir.path().join("subdir");
    fs::create_dir(&subdir).unwrap();
    paths.push(subdir.clone());

    let err = run_files(&paths).expect_err("reading a directory should fail");

    assert!(err.to_string().starts_with("failed to read"));
    let DemoError::Read { path, .. } = err else {
        panic!("expected Read error");
    };
    assert_eq!(path, subdir);
}
