//! Fixture helpers shared by the unit tests.

use crate::record::Record;
use std::fs;
use std::path::{Path, PathBuf};

pub fn touch(path: &Path) {
    fs::write(path, b"").unwrap();
}

pub fn write_raw(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
}

pub fn record(id: &str, title: &str, media: &str, secondary: Option<&str>) -> Record {
    Record {
        id: id.to_string(),
        title: title.to_string(),
        media_file: media.to_string(),
        secondary_file: secondary.map(str::to_string),
        ..Record::default()
    }
}

/// Write a minimal valid record into `dir` and return its path.
pub fn write_dvk(
    dir: &Path,
    name: &str,
    id: &str,
    title: &str,
    media: &str,
    secondary: Option<&str>,
) -> PathBuf {
    let path = dir.join(name);
    record(id, title, media, secondary).write(&path).unwrap();
    path
}
