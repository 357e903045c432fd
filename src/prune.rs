use crate::ignore_rules::{IgnoreError, IgnoreRules, PATTERN_FILE};
use crate::walk::{TreeWalker, WalkError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A directory holding this file is a project whose artifacts get pruned.
pub const MARKER_FILE: &str = "package.json";

/// Removed from every marker directory whether or not the pattern file
/// lists them.
pub const REMOVAL_SET: &[&str] = &["node_modules", ".git"];

pub const DEFAULT_MAX_DEPTH: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum PruneError {
    #[error("Directory walk error: {0}")]
    Walk(#[from] WalkError),
    #[error("Pattern file error: {0}")]
    Ignore(#[from] IgnoreError),
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PruneOptions {
    pub marker_file: String,
    pub removal_set: Vec<String>,
    pub pattern_file: String,
    /// Deepest level below the root at which marker directories are looked for.
    pub max_depth: usize,
    pub dry_run: bool,
}

impl Default for PruneOptions {
    fn default() -> Self {
        PruneOptions {
            marker_file: MARKER_FILE.to_string(),
            removal_set: REMOVAL_SET.iter().map(|s| s.to_string()).collect(),
            pattern_file: PATTERN_FILE.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            dry_run: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct PruneResult {
    /// Marker directories found, in walk order.
    pub marker_dirs: Vec<PathBuf>,
    /// Paths that existed and were removed (or would be, on a dry run).
    pub removed: Vec<PathBuf>,
}

/// Find marker directories below `root` and prune each of them.
///
/// Directories at depths 1 to `options.max_depth` are checked for the marker
/// file; `root` itself is not. A marker directory is pruned and never
/// descended into, so a project nested inside another project is left to
/// the outer one's pattern file. Symlinks are never followed, so a link to a
/// project elsewhere is not treated as a marker directory.
///
/// Pruning a marker directory removes every name in `options.removal_set`
/// and then every path its pattern file matches. Paths that do not exist
/// are skipped.
///
/// # Errors
///
/// The first walk, pattern file or removal failure aborts the whole
/// operation. Paths already removed stay removed.
pub fn prune_tree(root: &Path, options: &PruneOptions) -> Result<PruneResult, PruneError> {
    info!(
        "Searching for {} within {} levels of {}",
        options.marker_file,
        options.max_depth,
        root.display()
    );

    let mut result = PruneResult::default();
    let mut walker = TreeWalker::new(root)
        .max_depth(options.max_depth)
        .follow_links(false);

    while let Some(entry) = walker.next() {
        let entry = entry?;
        if !entry.is_dir() {
            continue;
        }

        if has_marker(&entry.path, &options.marker_file) {
            walker.skip_current_dir();
            prune_marker_dir(&entry.path, options, &mut result)?;
        }
    }

    Ok(result)
}

/// Anything but a definite "not found" counts as present, so an unreadable
/// marker still gets its directory pruned (or the removal reports why not).
fn has_marker(dir: &Path, marker_file: &str) -> bool {
    let marker = dir.join(marker_file);
    match std::fs::metadata(&marker) {
        Ok(_) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Cannot check {}: {e}", marker.display());
            true
        }
    }
}

fn prune_marker_dir(
    dir: &Path,
    options: &PruneOptions,
    result: &mut PruneResult,
) -> Result<(), PruneError> {
    info!("Cleaning {}", dir.display());
    result.marker_dirs.push(dir.to_path_buf());

    for name in &options.removal_set {
        remove_path(&dir.join(name), options.dry_run, result)?;
    }

    let rules = IgnoreRules::load(dir, &options.pattern_file)?;
    if rules.is_empty() {
        return Ok(());
    }

    let mut walker = TreeWalker::new(dir)
        .max_depth(rules.max_depth())
        .follow_links(false);

    while let Some(entry) = walker.next() {
        let entry = entry?;

        // Already handled above; only reachable here on a dry run.
        let in_removal_set = entry.depth == 1
            && options
                .removal_set
                .iter()
                .any(|name| entry.relative_path == Path::new(name));

        if in_removal_set {
            walker.skip_current_dir();
        } else if rules.matches(&entry.path) {
            walker.skip_current_dir();
            remove_path(&entry.path, options.dry_run, result)?;
        }
    }

    Ok(())
}

fn remove_path(path: &Path, dry_run: bool, result: &mut PruneResult) -> Result<(), PruneError> {
    let remove_err = |source: std::io::Error| PruneError::Remove {
        path: path.to_path_buf(),
        source,
    };

    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Nothing to remove at {}", path.display());
            return Ok(());
        }
        Err(e) => return Err(remove_err(e)),
    };

    if dry_run {
        info!("Would remove {}", path.display());
    } else {
        // Symlinks are unlinked, never followed.
        if metadata.is_dir() {
            std::fs::remove_dir_all(path).map_err(remove_err)?;
        } else {
            std::fs::remove_file(path).map_err(remove_err)?;
        }
        info!("Removed {}", path.display());
    }

    result.removed.push(path.to_path_buf());
    Ok(())
}
