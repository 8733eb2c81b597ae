pub mod filename;

use crate::record::Record;
use crate::scanner::{IndexedRecord, IndexedTree};
use filename::SanitizePolicy;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Highest numeric suffix tried before giving up on a name.
pub const MAX_SUFFIX: u32 = 10_000;
/// Upper bound on re-planning passes after the main batch.
pub const MAX_SETTLE_PASSES: usize = 16;

#[derive(Error, Debug)]
pub enum RenameError {
    #[error("Source file missing: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("No free name for {} after {} attempts", .0.display(), MAX_SUFFIX)]
    CollisionExhausted(PathBuf),
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One file moving to a new name in the same directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl Move {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Target names for one record and the files it references.
#[derive(Debug, Clone)]
pub struct RenamePlan {
    pub media: Move,
    pub secondary: Option<Move>,
    pub record: Move,
}

impl RenamePlan {
    /// Moves that actually change a name, in the order they are applied.
    pub fn moves(&self) -> Vec<&Move> {
        std::iter::once(&self.media)
            .chain(self.secondary.as_ref())
            .chain(std::iter::once(&self.record))
            .filter(|m| !m.is_noop())
            .collect()
    }

    pub fn is_noop(&self) -> bool {
        self.moves().is_empty()
    }
}

#[derive(Debug)]
pub enum RenameAction {
    /// Already canonical.
    Unchanged,
    /// The record failed validation; its paths aren't trusted, so nothing moved.
    SkippedInvalid,
    Renamed { moves: Vec<Move> },
}

/// What happened to one record during a batch.
#[derive(Debug)]
pub struct RenameOutcome {
    /// Where the record was before the batch started.
    pub record: PathBuf,
    pub result: Result<RenameAction, RenameError>,
}

/// Work out canonical names for a record without touching anything.
///
/// Fails with [`RenameError::SourceMissing`] if a referenced file is gone.
/// Each file is disambiguated on its own: the first of `base`, `base_2`,
/// `base_3`, … (plus the file's own extension) that is free in its
/// directory, or is already the file itself, wins.
pub fn plan(entry: &IndexedRecord, policy: &SanitizePolicy) -> Result<RenamePlan, RenameError> {
    let base = policy.canonical_base(&entry.record.title, &entry.record.id);
    let (media_path, secondary_path) = entry.media_paths();

    for source in std::iter::once(&entry.path)
        .chain(std::iter::once(&media_path))
        .chain(secondary_path.as_ref())
    {
        if !source.is_file() {
            return Err(RenameError::SourceMissing(source.clone()));
        }
    }

    // Targets picked for earlier files of this record, not yet on disk.
    let mut claimed: Vec<PathBuf> = Vec::new();

    let media = plan_move(&media_path, &base, &claimed)?;
    claimed.push(media.to.clone());

    let secondary = match secondary_path {
        Some(path) => {
            let m = plan_move(&path, &base, &claimed)?;
            claimed.push(m.to.clone());
            Some(m)
        }
        None => None,
    };

    let record = plan_move(&entry.path, &base, &claimed)?;

    Ok(RenamePlan {
        media,
        secondary,
        record,
    })
}

fn plan_move(source: &Path, base: &str, claimed: &[PathBuf]) -> Result<Move, RenameError> {
    let dir = source.parent().unwrap_or(Path::new(""));
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 1..=MAX_SUFFIX {
        let name = if n == 1 {
            format!("{base}{ext}")
        } else {
            format!("{base}_{n}{ext}")
        };
        let target = dir.join(name);
        if claimed.contains(&target) {
            continue;
        }
        if is_same_file(&target, source) {
            return Ok(Move {
                from: source.to_path_buf(),
                to: source.to_path_buf(),
            });
        }
        if !target.exists() {
            return Ok(Move {
                from: source.to_path_buf(),
                to: target,
            });
        }
    }

    Err(RenameError::CollisionExhausted(source.to_path_buf()))
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Plan every record in the tree. Used for dry runs.
///
/// Plans are computed against the disk as it is now, so two records that
/// would race for the same free name both report it here; the real batch
/// hands the second one a suffix.
pub fn plan_all(tree: &IndexedTree, policy: &SanitizePolicy) -> Vec<(PathBuf, Result<RenamePlan, RenameError>)> {
    tree.valid_records()
        .map(|entry| (entry.path.clone(), plan(entry, policy)))
        .collect()
}

/// Rename every valid record in the tree, and its media, to canonical names.
///
/// Consumes the tree: once files start moving the index is stale. A failure
/// on one record is recorded in its outcome and the batch carries on.
pub fn rename_all(tree: IndexedTree, policy: &SanitizePolicy) -> Vec<RenameOutcome> {
    let records = tree.into_records();

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    pb.set_message("Renaming files...");

    let mut outcomes = Vec::with_capacity(records.len());

    for entry in records {
        let path = entry.path.clone();
        let result = if entry.valid {
            rename_record(entry, policy)
        } else {
            log::warn!("Skipping invalid record {}", path.display());
            Ok(RenameAction::SkippedInvalid)
        };

        if let Err(e) = &result {
            log::warn!("Error renaming {}: {}", path.display(), e);
        }

        outcomes.push(RenameOutcome {
            record: path,
            result,
        });
        pb.inc(1);
    }

    pb.set_message("Settling suffixed names...");
    settle(&mut outcomes, policy);

    let mut renamed = 0usize;
    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(RenameAction::Renamed { moves }) => {
                renamed += 1;
                for m in moves {
                    log::debug!("{} -> {}", m.from.display(), m.to.display());
                }
            }
            Ok(_) => {}
            Err(_) => failed += 1,
        }
    }

    pb.finish_with_message(format!("Done: {} renamed, {} failed", renamed, failed));
    outcomes
}

/// Re-plan every record that came through the batch cleanly until a pass
/// moves nothing.
///
/// A record can end up at `base_2` only because a record later in the batch
/// still held `base` at the time. Once that one has moved on, the plain name
/// is free and the next run would take it. A file only ever moves to a lower
/// suffix here, so the passes converge.
fn settle(outcomes: &mut [RenameOutcome], policy: &SanitizePolicy) {
    for pass in 1..=MAX_SETTLE_PASSES {
        let mut moved = false;

        for outcome in outcomes.iter_mut() {
            let current = match &outcome.result {
                Ok(RenameAction::Unchanged) => outcome.record.clone(),
                Ok(RenameAction::Renamed { moves }) => current_location(&outcome.record, moves),
                _ => continue,
            };
            let record = match Record::read(&current) {
                Ok(record) if record.is_valid() => record,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("Cannot re-read {}: {}", current.display(), e);
                    continue;
                }
            };
            let entry = IndexedRecord {
                path: current,
                record,
                valid: true,
            };

            match rename_record(entry, policy) {
                Ok(RenameAction::Renamed { moves: more }) => {
                    moved = true;
                    match &mut outcome.result {
                        Ok(RenameAction::Renamed { moves }) => moves.extend(more),
                        result => *result = Ok(RenameAction::Renamed { moves: more }),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Error renaming {}: {}", outcome.record.display(), e);
                    outcome.result = Err(e);
                }
            }
        }

        if !moved {
            return;
        }
        log::debug!("Settling pass {} moved files", pass);
    }

    log::warn!("Names still settling after {} passes", MAX_SETTLE_PASSES);
}

/// Where a record file is now, following its own moves from `original`.
fn current_location(original: &Path, moves: &[Move]) -> PathBuf {
    moves.iter().fold(original.to_path_buf(), |at, m| {
        if m.from == at { m.to.clone() } else { at }
    })
}

fn rename_record(entry: IndexedRecord, policy: &SanitizePolicy) -> Result<RenameAction, RenameError> {
    let plan = plan(&entry, policy)?;
    if plan.is_noop() {
        return Ok(RenameAction::Unchanged);
    }
    let moves = apply(entry, &plan)?;
    Ok(RenameAction::Renamed { moves })
}

/// Carry out a plan: media first, then the record's stored references, then
/// the record file itself. Returns the moves made.
fn apply(entry: IndexedRecord, plan: &RenamePlan) -> Result<Vec<Move>, RenameError> {
    let IndexedRecord {
        path: record_path,
        mut record,
        ..
    } = entry;
    let mut moves = Vec::new();

    let media_result = move_media(plan, &mut record, &mut moves);
    // Whatever moved must be reflected in the record before anything else.
    if !moves.is_empty() {
        write_record(&record, &record_path)?;
    }
    media_result?;

    if !plan.record.is_noop() {
        move_file(&plan.record)?;
        moves.push(plan.record.clone());
    }

    Ok(moves)
}

/// Move the media and secondary files, updating the in-memory references as
/// each move lands. Stops at the first failure; `moves` holds what was done.
fn move_media(plan: &RenamePlan, record: &mut Record, moves: &mut Vec<Move>) -> Result<(), RenameError> {
    if !plan.media.is_noop() {
        move_file(&plan.media)?;
        record.media_file = renamed_reference(&record.media_file, &plan.media.to);
        moves.push(plan.media.clone());
    }
    if let Some(secondary) = plan.secondary.as_ref().filter(|m| !m.is_noop()) {
        move_file(secondary)?;
        if let Some(reference) = record.secondary_file.as_mut() {
            *reference = renamed_reference(reference, &secondary.to);
        }
        moves.push(secondary.clone());
    }
    Ok(())
}

/// Swap the file name in a stored relative reference, keeping any
/// directory prefix it had.
fn renamed_reference(reference: &str, new_path: &Path) -> String {
    match new_path.file_name() {
        Some(name) => Path::new(reference)
            .with_file_name(name)
            .to_string_lossy()
            .into_owned(),
        None => reference.to_string(),
    }
}

fn move_file(m: &Move) -> Result<(), RenameError> {
    if !m.from.exists() {
        return Err(RenameError::SourceMissing(m.from.clone()));
    }
    // Re-checked right before the move: never overwrite.
    if m.to.exists() && !is_same_file(&m.to, &m.from) {
        return Err(RenameError::Io {
            path: m.to.clone(),
            source: std::io::Error::from(std::io::ErrorKind::AlreadyExists),
        });
    }
    std::fs::rename(&m.from, &m.to).map_err(|source| RenameError::Io {
        path: m.from.clone(),
        source,
    })
}

fn write_record(record: &Record, path: &Path) -> Result<(), RenameError> {
    let json = record.to_json().map_err(|e| RenameError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;
    std::fs::write(path, json).map_err(|source| RenameError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::build;
    use crate::test_support::{touch, write_dvk, write_raw};
    use std::fs;

    fn policy() -> SanitizePolicy {
        SanitizePolicy::default()
    }

    fn failures(outcomes: &[RenameOutcome]) -> usize {
        outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    fn all_unchanged(outcomes: &[RenameOutcome]) -> bool {
        outcomes
            .iter()
            .all(|o| matches!(o.result, Ok(RenameAction::Unchanged)))
    }

    #[test]
    fn renames_record_and_media_together() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.png"), b"image").unwrap();
        fs::write(root.join("a_thumb.jpg"), b"thumb").unwrap();
        write_dvk(root, "a.dvk", "ID1", "My Title", "a.png", Some("a_thumb.jpg"));

        let outcomes = rename_all(build(root).unwrap(), &policy());
        assert_eq!(failures(&outcomes), 0);
        assert!(matches!(outcomes[0].result, Ok(RenameAction::Renamed { .. })));

        assert!(!root.join("a.dvk").exists());
        assert!(!root.join("a.png").exists());
        assert_eq!(fs::read(root.join("My Title_ID1.png")).unwrap(), b"image");
        assert_eq!(fs::read(root.join("My Title_ID1.jpg")).unwrap(), b"thumb");

        let record = Record::parse(&fs::read(root.join("My Title_ID1.dvk")).unwrap()).unwrap();
        assert_eq!(record.media_file, "My Title_ID1.png");
        assert_eq!(record.secondary_file.as_deref(), Some("My Title_ID1.jpg"));
    }

    #[test]
    fn second_run_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a.png"));
        touch(&root.join("b.gif"));
        write_dvk(root, "a.dvk", "1", "First", "a.png", None);
        write_dvk(root, "b.dvk", "2", "Second", "b.gif", None);

        let first = rename_all(build(root).unwrap(), &policy());
        assert_eq!(failures(&first), 0);
        let second = rename_all(build(root).unwrap(), &policy());
        assert!(all_unchanged(&second));
    }

    #[test]
    fn colliding_names_get_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.png"), b"first").unwrap();
        fs::write(root.join("b.png"), b"second").unwrap();
        write_dvk(root, "a.dvk", "1", "Same", "a.png", None);
        write_dvk(root, "b.dvk", "1", "Same", "b.png", None);

        let outcomes = rename_all(build(root).unwrap(), &policy());
        assert_eq!(failures(&outcomes), 0);

        assert_eq!(fs::read(root.join("Same_1.png")).unwrap(), b"first");
        assert_eq!(fs::read(root.join("Same_1_2.png")).unwrap(), b"second");
        let second = Record::parse(&fs::read(root.join("Same_1_2.dvk")).unwrap()).unwrap();
        assert_eq!(second.media_file, "Same_1_2.png");
        assert!(root.join("Same_1.dvk").exists());

        let again = rename_all(build(root).unwrap(), &policy());
        assert!(all_unchanged(&again));
    }

    #[test]
    fn existing_unrelated_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("T_1.png"), b"bystander").unwrap();
        fs::write(root.join("x.png"), b"mine").unwrap();
        write_dvk(root, "x.dvk", "1", "T", "x.png", None);

        let outcomes = rename_all(build(root).unwrap(), &policy());
        assert_eq!(failures(&outcomes), 0);
        assert_eq!(fs::read(root.join("T_1.png")).unwrap(), b"bystander");
        assert_eq!(fs::read(root.join("T_1_2.png")).unwrap(), b"mine");
        // The record's own name is free, so it takes the plain base.
        assert!(root.join("T_1.dvk").exists());
    }

    #[test]
    fn media_sharing_an_extension_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("full.png"), b"full").unwrap();
        fs::write(root.join("small.png"), b"small").unwrap();
        write_dvk(root, "r.dvk", "9", "Pic", "full.png", Some("small.png"));

        let outcomes = rename_all(build(root).unwrap(), &policy());
        assert_eq!(failures(&outcomes), 0);
        assert_eq!(fs::read(root.join("Pic_9.png")).unwrap(), b"full");
        assert_eq!(fs::read(root.join("Pic_9_2.png")).unwrap(), b"small");

        let again = rename_all(build(root).unwrap(), &policy());
        assert!(all_unchanged(&again));
    }

    #[test]
    fn missing_source_fails_that_record_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_dvk(root, "gone.dvk", "1", "Gone", "gone.png", None);
        touch(&root.join("here.png"));
        write_dvk(root, "here.dvk", "2", "Here", "here.png", None);

        let outcomes = rename_all(build(root).unwrap(), &policy());
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].result, Err(RenameError::SourceMissing(_))));
        assert!(root.join("gone.dvk").exists());
        assert!(root.join("Here_2.dvk").exists());
        assert!(root.join("Here_2.png").exists());
    }

    #[test]
    fn invalid_records_are_skipped_not_failed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_raw(&root.join("bad.dvk"), r#"{"id": "1", "media_file": "m.png"}"#);
        touch(&root.join("m.png"));

        let outcomes = rename_all(build(root).unwrap(), &policy());
        assert!(matches!(outcomes[0].result, Ok(RenameAction::SkippedInvalid)));
        assert!(root.join("bad.dvk").exists());
        assert!(root.join("m.png").exists());
    }

    #[test]
    fn unknown_fields_survive_rename() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("m.png"));
        write_raw(
            &root.join("r.dvk"),
            r#"{"id": "5", "title": "Keep", "media_file": "m.png", "rating": 4}"#,
        );

        rename_all(build(root).unwrap(), &policy());
        let record = Record::parse(&fs::read(root.join("Keep_5.dvk")).unwrap()).unwrap();
        assert_eq!(record.extra.get("rating"), Some(&serde_json::json!(4)));
    }

    #[test]
    fn media_in_other_folder_stays_there() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("dvks")).unwrap();
        fs::create_dir(root.join("media")).unwrap();
        touch(&root.join("media/m.png"));
        write_dvk(&root.join("dvks"), "r.dvk", "3", "Away", "../media/m.png", None);

        let outcomes = rename_all(build(root).unwrap(), &policy());
        assert_eq!(failures(&outcomes), 0);
        assert!(root.join("media/Away_3.png").exists());
        let record = Record::parse(&fs::read(root.join("dvks/Away_3.dvk")).unwrap()).unwrap();
        assert_eq!(record.media_file, "../media/Away_3.png");
    }

    #[test]
    fn plan_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a.png"));
        write_dvk(root, "a.dvk", "1", "Planned", "a.png", None);

        let tree = build(root).unwrap();
        let plans = plan_all(&tree, &policy());
        let plan = plans[0].1.as_ref().unwrap();
        assert_eq!(plan.moves().len(), 2);
        assert_eq!(plan.media.to, tree.root().join("Planned_1.png"));
        assert_eq!(plan.record.to, tree.root().join("Planned_1.dvk"));
        assert!(root.join("a.png").exists());
        assert!(root.join("a.dvk").exists());
    }

    #[test]
    fn reference_keeps_its_directory_prefix() {
        assert_eq!(renamed_reference("a.png", Path::new("/r/B_1.png")), "B_1.png");
        assert_eq!(
            renamed_reference("sub/a.png", Path::new("/r/sub/B_1.png")),
            Path::new("sub").join("B_1.png").to_string_lossy()
        );
    }

    #[test]
    fn suffix_is_dropped_once_the_plain_name_frees_up() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("x.png"), b"mine").unwrap();
        // Holds "T_1.png" until its own record moves it away later in the batch.
        fs::write(root.join("T_1.png"), b"theirs").unwrap();
        write_dvk(root, "a.dvk", "1", "T", "x.png", None);
        write_dvk(root, "z.dvk", "9", "Z", "T_1.png", None);

        let first = rename_all(build(root).unwrap(), &policy());
        assert_eq!(failures(&first), 0);
        assert_eq!(fs::read(root.join("T_1.png")).unwrap(), b"mine");
        assert_eq!(fs::read(root.join("Z_9.png")).unwrap(), b"theirs");
        assert!(!root.join("T_1_2.png").exists());

        let record = Record::parse(&fs::read(root.join("T_1.dvk")).unwrap()).unwrap();
        assert_eq!(record.media_file, "T_1.png");
        match &first[0].result {
            Ok(RenameAction::Renamed { moves }) => {
                let now_at = current_location(&first[0].record, moves);
                assert!(now_at.ends_with("T_1.dvk"));
                assert!(moves.iter().any(|m| m.to.ends_with("T_1.png")));
            }
            other => panic!("expected a rename, got {other:?}"),
        }

        let second = rename_all(build(root).unwrap(), &policy());
        assert!(all_unchanged(&second));
    }

    #[test]
    fn failure_after_media_moved_keeps_old_record_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("m.png"), b"media").unwrap();
        fs::write(root.join("s.jpg"), b"thumb").unwrap();
        write_dvk(root, "r.dvk", "1", "T", "m.png", Some("s.jpg"));

        let entry = build(root).unwrap().into_records().remove(0);
        let plan = plan(&entry, &policy()).unwrap();
        // Something takes the secondary's target between planning and moving.
        fs::write(root.join("T_1.jpg"), b"late arrival").unwrap();

        let err = apply(entry, &plan).unwrap_err();
        match err {
            RenameError::Io { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists)
            }
            other => panic!("expected an IO error, got {other:?}"),
        }

        assert_eq!(fs::read(root.join("T_1.png")).unwrap(), b"media");
        assert_eq!(fs::read(root.join("s.jpg")).unwrap(), b"thumb");
        assert_eq!(fs::read(root.join("T_1.jpg")).unwrap(), b"late arrival");
        assert!(!root.join("T_1.dvk").exists());

        // The record keeps its name but already points at the moved media.
        let record = Record::parse(&fs::read(root.join("r.dvk")).unwrap()).unwrap();
        assert_eq!(record.media_file, "T_1.png");
        assert_eq!(record.secondary_file.as_deref(), Some("s.jpg"));
    }

    #[test]
    fn move_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.png"), b"a").unwrap();
        fs::write(root.join("b.png"), b"b").unwrap();

        let m = Move {
            from: root.join("a.png"),
            to: root.join("b.png"),
        };
        assert!(matches!(move_file(&m), Err(RenameError::Io { .. })));
        assert_eq!(fs::read(root.join("b.png")).unwrap(), b"b");
        assert!(root.join("a.png").exists());
    }

    #[cfg(unix)]
    #[test]
    fn io_failure_in_one_record_does_not_stop_the_batch() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("locked")).unwrap();
        fs::create_dir(root.join("open")).unwrap();
        touch(&root.join("locked/a.png"));
        write_dvk(&root.join("locked"), "a.dvk", "1", "A", "a.png", None);
        touch(&root.join("open/b.png"));
        write_dvk(&root.join("open"), "b.dvk", "2", "B", "b.png", None);

        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
        // Permission bits don't bind a privileged user; nothing to test then.
        let check = locked.join("writable");
        if fs::write(&check, b"").is_ok() {
            fs::remove_file(&check).unwrap();
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let outcomes = rename_all(build(root).unwrap(), &policy());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].result, Err(RenameError::Io { .. })));
        assert!(matches!(outcomes[1].result, Ok(RenameAction::Renamed { .. })));
        assert!(root.join("locked/a.dvk").exists());
        assert!(root.join("locked/a.png").exists());
        assert!(root.join("open/B_2.dvk").exists());
        assert!(root.join("open/B_2.png").exists());
    }
}
