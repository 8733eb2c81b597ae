//! Read-only integrity checks over an [`IndexedTree`].
//!
//! Every check returns paths in walk order, so repeated runs over an
//! unchanged tree print the same list.

use crate::record::ParseError;
use crate::scanner::IndexedTree;
use std::path::{Path, PathBuf};

/// Valid records whose id is carried by at least one other valid record.
pub fn same_ids(tree: &IndexedTree) -> Vec<PathBuf> {
    tree.valid_records()
        .filter(|r| tree.records_with_id(&r.record.id).len() > 1)
        .map(|r| r.path.clone())
        .collect()
}

/// Files no record points at.
///
/// Folders with no record anywhere beneath them are treated as foreign
/// content and skipped wholesale.
pub fn unlinked(tree: &IndexedTree) -> Vec<PathBuf> {
    tree.all_files()
        .iter()
        .filter(|path| !tree.is_referenced(path))
        .filter(|path| {
            // A record-free ancestor implies a record-free parent.
            path.parent()
                .is_some_and(|dir| tree.has_records_beneath(dir))
        })
        .cloned()
        .collect()
}

/// Valid records with a media or secondary file that doesn't exist.
/// Each record appears at most once.
pub fn missing_media(tree: &IndexedTree) -> Vec<PathBuf> {
    tree.valid_records()
        .filter(|r| {
            let (media, secondary) = r.media_paths();
            !media.exists() || secondary.is_some_and(|s| !s.exists())
        })
        .map(|r| r.path.clone())
        .collect()
}

/// Record files that could not be read, decoded or validated.
pub fn malformed(tree: &IndexedTree) -> Vec<(&Path, &ParseError)> {
    tree.malformed()
        .iter()
        .map(|(path, err)| (path.as_path(), err))
        .collect()
}
