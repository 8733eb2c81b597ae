use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dvk_archive::checks;
use dvk_archive::config::AppConfig;
use dvk_archive::rename::{self, RenameAction};
use dvk_archive::scanner::{self, IndexedTree, ScanOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dvk", version, about = "DVK archive maintenance tools")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print absolute paths instead of paths relative to the directory
    #[arg(long, global = true)]
    absolute: bool,

    /// Don't follow symbolic links while walking the directory
    #[arg(long, global = true)]
    no_follow_symlinks: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List DVK files that share their ID with another DVK file
    SameIds {
        /// Directory to search (defaults to the current directory)
        directory: Option<PathBuf>,
    },

    /// List files that no DVK file references
    Unlinked {
        /// Directory to search (defaults to the current directory)
        directory: Option<PathBuf>,
    },

    /// List DVK files whose media or secondary file is missing
    MissingMedia {
        /// Directory to search (defaults to the current directory)
        directory: Option<PathBuf>,
    },

    /// List DVK files that can't be read or are missing required fields
    Malformed {
        /// Directory to search (defaults to the current directory)
        directory: Option<PathBuf>,
    },

    /// Rename DVK files and their media to Title_ID names
    Rename {
        /// Directory to rename in (defaults to the current directory)
        directory: Option<PathBuf>,

        /// Show what would be renamed without touching any file
        #[arg(long)]
        dry_run: bool,
    },
}

const EXIT_CLEAN: u8 = 0;
/// Findings reported, or for `rename`, at least one record failed.
const EXIT_FINDINGS: u8 = 1;
/// The directory couldn't be read at all.
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let result = run(cli);
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }
    ExitCode::from(exit_status(&result))
}

fn exit_status(result: &Result<bool>) -> u8 {
    match result {
        Ok(false) => EXIT_CLEAN,
        Ok(true) => EXIT_FINDINGS,
        Err(_) => EXIT_ERROR,
    }
}

/// Returns true when there is something to report.
fn run(cli: Cli) -> Result<bool> {
    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();
    let options = ScanOptions {
        follow_symlinks: config.follow_symlinks && !cli.no_follow_symlinks,
    };
    let absolute = cli.absolute;

    match cli.command {
        Commands::SameIds { directory } => {
            let tree = index(directory, &options)?;
            let found = checks::same_ids(&tree);
            print_paths(&found, &tree, absolute);
            summarize(found.len(), "DVK files with identical IDs");
            Ok(!found.is_empty())
        }

        Commands::Unlinked { directory } => {
            let tree = index(directory, &options)?;
            let found = checks::unlinked(&tree);
            print_paths(&found, &tree, absolute);
            summarize(found.len(), "unlinked files");
            Ok(!found.is_empty())
        }

        Commands::MissingMedia { directory } => {
            let tree = index(directory, &options)?;
            let found = checks::missing_media(&tree);
            print_paths(&found, &tree, absolute);
            summarize(found.len(), "DVK files with missing media");
            Ok(!found.is_empty())
        }

        Commands::Malformed { directory } => {
            let tree = index(directory, &options)?;
            let found = checks::malformed(&tree);
            for (path, err) in &found {
                println!("{}: {}", shown(path, &tree, absolute), err);
            }
            summarize(found.len(), "malformed DVK files");
            Ok(!found.is_empty())
        }

        Commands::Rename { directory, dry_run } => {
            let tree = index(directory, &options)?;
            if dry_run {
                dry_run_rename(&tree, &config, absolute)
            } else {
                run_rename(tree, &config, absolute)
            }
        }
    }
}

fn index(directory: Option<PathBuf>, options: &ScanOptions) -> Result<IndexedTree> {
    let dir = match directory {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    log::info!("Indexing {}", dir.display());
    let tree = scanner::build_with(&dir, options).context("Failed to index directory")?;
    Ok(tree)
}

fn run_rename(tree: IndexedTree, config: &AppConfig, absolute: bool) -> Result<bool> {
    let root = tree.root().to_path_buf();
    let outcomes = rename::rename_all(tree, &config.rename);

    let (mut renamed, mut unchanged, mut skipped, mut failed) = (0, 0, 0, 0);
    for outcome in &outcomes {
        match &outcome.result {
            Ok(RenameAction::Renamed { .. }) => renamed += 1,
            Ok(RenameAction::Unchanged) => unchanged += 1,
            Ok(RenameAction::SkippedInvalid) => skipped += 1,
            Err(e) => {
                failed += 1;
                println!("{}: {}", relative_to(&outcome.record, &root, absolute), e);
            }
        }
    }

    eprintln!(
        "Rename complete: {} renamed, {} unchanged, {} skipped (invalid), {} failed",
        renamed, unchanged, skipped, failed
    );
    Ok(failed > 0)
}

fn dry_run_rename(tree: &IndexedTree, config: &AppConfig, absolute: bool) -> Result<bool> {
    eprintln!("DRY RUN — no files will be renamed");
    let mut failed = 0usize;

    for (record, plan) in rename::plan_all(tree, &config.rename) {
        match plan {
            Ok(plan) => {
                for m in plan.moves() {
                    println!("{} -> {}", shown(&m.from, tree, absolute), shown(&m.to, tree, absolute));
                }
            }
            Err(e) => {
                failed += 1;
                println!("{}: {}", shown(&record, tree, absolute), e);
            }
        }
    }

    eprintln!("(dry run — re-run without --dry-run to apply)");
    Ok(failed > 0)
}

fn print_paths(paths: &[PathBuf], tree: &IndexedTree, absolute: bool) {
    for path in paths {
        println!("{}", shown(path, tree, absolute));
    }
}

fn summarize(count: usize, what: &str) {
    if count == 0 {
        eprintln!("No {} found.", what);
    } else {
        eprintln!("{} {} found.", count, what);
    }
}

fn shown(path: &Path, tree: &IndexedTree, absolute: bool) -> String {
    relative_to(path, tree.root(), absolute)
}

/// Paths print relative to the scanned directory unless asked otherwise.
fn relative_to(path: &Path, root: &Path, absolute: bool) -> String {
    if absolute {
        return path.display().to_string();
    }
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_per_result() {
        let cases: [(Result<bool>, u8); 3] = [
            (Ok(false), 0),
            (Ok(true), 1),
            (Err(anyhow::anyhow!("Cannot read root directory")), 2),
        ];
        for (result, expected) in &cases {
            assert_eq!(exit_status(result), *expected);
        }
    }

    #[test]
    fn paths_print_relative_unless_absolute() {
        let root = Path::new("/archive");
        let path = Path::new("/archive/sub/a.dvk");
        assert_eq!(relative_to(path, root, false), Path::new("sub").join("a.dvk").display().to_string());
        assert_eq!(relative_to(path, root, true), "/archive/sub/a.dvk");
        assert_eq!(relative_to(Path::new("/elsewhere/b.png"), root, false), "/elsewhere/b.png");
    }

    #[test]
    fn cli_parses_rename_dry_run() {
        let cli = Cli::try_parse_from(["dvk", "-vv", "rename", "some/dir", "--dry-run"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Rename { directory, dry_run } => {
                assert_eq!(directory, Some(PathBuf::from("some/dir")));
                assert!(dry_run);
            }
            _ => panic!("expected the rename subcommand"),
        }
    }
}
