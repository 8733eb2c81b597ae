use crate::record::{ParseError, Record};
use crate::RECORD_EXTENSION;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Cannot read root directory {}: {source}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub follow_symlinks: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { follow_symlinks: true }
    }
}

/// A decoded record and where it lives.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub path: PathBuf,
    pub record: Record,
    /// Whether the record passed [`Record::validate`]. Invalid records are
    /// kept for lookups but never take part in id or media checks.
    pub valid: bool,
}

impl IndexedRecord {
    pub fn containing_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn media_paths(&self) -> (PathBuf, Option<PathBuf>) {
        self.record.resolve_media_paths(self.containing_dir())
    }
}

/// Everything found under one root, cross-referenced.
///
/// Built once per invocation. All paths are absolute and rooted at the
/// canonicalized root; entries keep the order the walk found them in.
#[derive(Debug)]
pub struct IndexedTree {
    root: PathBuf,
    records: Vec<IndexedRecord>,
    by_path: HashMap<PathBuf, usize>,
    by_id: HashMap<String, Vec<usize>>,
    all_files: Vec<PathBuf>,
    referenced_files: HashSet<PathBuf>,
    malformed: Vec<(PathBuf, ParseError)>,
    dirs_with_records: HashSet<PathBuf>,
}

/// Index a tree with default options.
pub fn build(root: &Path) -> Result<IndexedTree, IndexError> {
    build_with(root, &ScanOptions::default())
}

/// Walk `root` and index every record and file beneath it.
///
/// Only an unreadable root fails the call. Problems with individual entries
/// are logged and the walk moves on; records that fail to load end up in
/// [`IndexedTree::malformed`].
pub fn build_with(root: &Path, options: &ScanOptions) -> Result<IndexedTree, IndexError> {
    let root_err = |source| IndexError::Root {
        path: root.to_path_buf(),
        source,
    };
    let canonical_root = std::fs::canonicalize(root).map_err(root_err)?;
    std::fs::read_dir(&canonical_root).map_err(root_err)?;

    let mut tree = IndexedTree::new(canonical_root.clone());
    // Real paths already seen; a second visit through another symlink is a no-op.
    let mut visited: HashSet<PathBuf> = HashSet::new();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {pos} files indexed {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Loading DVK files...");

    let mut walker = WalkDir::new(&canonical_root)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.loop_ancestor().is_some() {
                    log::debug!("Skipping symlink cycle: {}", e);
                } else {
                    log::warn!("Skipping unreadable entry: {}", e);
                }
                continue;
            }
        };
        let path = entry.path();
        let file_type = entry.file_type();
        // Unfollowed symlinks and special files are neither walked nor indexed.
        if !file_type.is_dir() && !file_type.is_file() {
            continue;
        }

        let real = match std::fs::canonicalize(path) {
            Ok(real) => real,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if !visited.insert(real) {
            log::debug!("Already visited {}, skipping", path.display());
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        if file_type.is_dir() {
            continue;
        }

        if is_record_path(path) {
            tree.insert_record(path.to_path_buf());
        } else {
            tree.all_files.push(path.to_path_buf());
        }
        pb.inc(1);
    }

    pb.finish_with_message(format!(
        "Done: {} records, {} other files, {} malformed",
        tree.records.len(),
        tree.all_files.len(),
        tree.malformed.len()
    ));

    Ok(tree)
}

/// Whether a path names a DVK record, judged by extension alone.
pub fn is_record_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(RECORD_EXTENSION))
}

impl IndexedTree {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            records: Vec::new(),
            by_path: HashMap::new(),
            by_id: HashMap::new(),
            all_files: Vec::new(),
            referenced_files: HashSet::new(),
            malformed: Vec::new(),
            dirs_with_records: HashSet::new(),
        }
    }

    fn insert_record(&mut self, path: PathBuf) {
        // Even a record we can't read marks its folders as archive content.
        self.mark_has_records(&path);

        let record = match Record::read(&path) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Malformed DVK {}: {}", path.display(), e);
                self.malformed.push((path, e));
                return;
            }
        };

        let valid = match record.validate() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Invalid DVK {}: {}", path.display(), e);
                self.malformed.push((path.clone(), e));
                false
            }
        };

        let idx = self.records.len();
        let entry = IndexedRecord {
            path,
            record,
            valid,
        };

        if valid {
            let (media, secondary) = entry.media_paths();
            self.referenced_files.insert(media);
            if let Some(secondary) = secondary {
                self.referenced_files.insert(secondary);
            }
            self.by_id
                .entry(entry.record.id.clone())
                .or_default()
                .push(idx);
        }
        self.by_path.insert(entry.path.clone(), idx);
        self.records.push(entry);
    }

    fn mark_has_records(&mut self, record_path: &Path) {
        let mut dir = record_path.parent();
        while let Some(d) = dir {
            if !d.starts_with(&self.root) || !self.dirs_with_records.insert(d.to_path_buf()) {
                break;
            }
            dir = d.parent();
        }
    }

    /// The canonicalized root this tree was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every decoded record, valid or not, in walk order.
    pub fn records(&self) -> &[IndexedRecord] {
        &self.records
    }

    pub fn valid_records(&self) -> impl Iterator<Item = &IndexedRecord> {
        self.records.iter().filter(|r| r.valid)
    }

    pub fn record(&self, path: &Path) -> Option<&IndexedRecord> {
        self.by_path.get(path).map(|&idx| &self.records[idx])
    }

    /// Valid records carrying `id`, in walk order.
    pub fn records_with_id(&self, id: &str) -> Vec<&IndexedRecord> {
        self.by_id
            .get(id)
            .map(|idxs| idxs.iter().map(|&idx| &self.records[idx]).collect())
            .unwrap_or_default()
    }

    /// Every non-record file, in walk order.
    pub fn all_files(&self) -> &[PathBuf] {
        &self.all_files
    }

    pub fn is_referenced(&self, path: &Path) -> bool {
        self.referenced_files.contains(path)
    }

    /// Records that failed to load or validate, with the reason.
    pub fn malformed(&self) -> &[(PathBuf, ParseError)] {
        &self.malformed
    }

    /// Whether any record, readable or not, lives in `dir` or below it.
    pub fn has_records_beneath(&self, dir: &Path) -> bool {
        self.dirs_with_records.contains(dir)
    }

    /// Give up the index and keep only the records. Used by the renamer,
    /// after which the rest of the index no longer describes the disk.
    pub fn into_records(self) -> Vec<IndexedRecord> {
        self.records
    }
}
