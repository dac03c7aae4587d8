use std::fs;

use jobwatch_engine::{ensure_output_dir, safe_artifact_filename, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("downloads").join("csv");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_download() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("jobs.csv", b"REF\n1\n").unwrap();
    assert_eq!(first.file_name().unwrap(), "jobs.csv");
    assert_eq!(fs::read(&first).unwrap(), b"REF\n1\n");

    let second = writer.write("jobs.csv", b"REF\n2\n").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "REF\n2\n");

    // Only the final file remains; the temp file was renamed into place.
    let entries = fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("jobs.csv", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("jobs.csv").exists());
}

#[test]
fn sanitized_handle_stays_inside_output_dir() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let path = writer
        .write(&safe_artifact_filename("../../escape.csv"), b"x")
        .unwrap();
    assert_eq!(path.parent().unwrap(), temp.path());
    assert_eq!(path.file_name().unwrap(), "escape.csv");
}
