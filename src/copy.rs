use crate::walk::{TreeWalker, WalkError};
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to a directory name to form its backup's name.
pub const BACKUP_SUFFIX: &str = "_bak";

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("Backup directory already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Directory walk error: {0}")]
    Walk(#[from] WalkError),
    #[error("Failed to copy {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CopyResult {
    pub files_copied: usize,
    /// Directories created below the destination root.
    pub dirs_created: usize,
    pub bytes_copied: u64,
}

/// Path of the backup directory for `source`: a sibling named
/// `<source name>_bak`.
pub fn backup_path_for(source: &Path) -> PathBuf {
    let mut name = source
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| source.as_os_str().to_owned());
    name.push(BACKUP_SUFFIX);
    source.with_file_name(name)
}

/// Recursively copy the directory `source` to `destination`.
///
/// # Behavior
///
/// - Refuses to run if `destination` exists in any form (including a dangling
///   symlink), before touching the filesystem
/// - Creates `destination` and any missing ancestors, then mirrors every
///   directory and streams every file below `source`
/// - Symlinks are followed, so the copy contains regular files and
///   directories only
///
/// # Errors
///
/// The first failure stops the copy. Whatever was copied up to that point is
/// left in place.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<CopyResult, CopyError> {
    if destination.symlink_metadata().is_ok() {
        return Err(CopyError::AlreadyExists(destination.to_path_buf()));
    }

    let is_dir = std::fs::metadata(source).map_err(io_err(source))?.is_dir();
    if !is_dir {
        return Err(CopyError::NotADirectory(source.to_path_buf()));
    }

    info!(
        "Copying {} to {}",
        source.display(),
        destination.display()
    );

    create_dir(destination, true)?;

    let mut result = CopyResult::default();

    for entry in TreeWalker::new(source) {
        let entry = entry?;
        let target = destination.join(&entry.relative_path);

        if entry.is_dir() {
            create_dir(&target, false)?;
            result.dirs_created += 1;
        } else {
            result.bytes_copied += copy_file(&entry.path, &target)?;
            result.files_copied += 1;
        }
    }

    info!(
        "Copied {} files in {} directories ({} bytes)",
        result.files_copied, result.dirs_created, result.bytes_copied
    );

    Ok(result)
}

fn create_dir(path: &Path, recursive: bool) -> Result<(), CopyError> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }

    builder.create(path).map_err(io_err(path))
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CopyError {
    let path = path.to_path_buf();
    move |source| CopyError::Io { path, source }
}

fn copy_file(from: &Path, to: &Path) -> Result<u64, CopyError> {
    let mut reader = File::open(from).map_err(io_err(from))?;
    let mut writer = File::create(to).map_err(io_err(to))?;
    let bytes = std::io::copy(&mut reader, &mut writer).map_err(io_err(to))?;
    writer.sync_all().map_err(io_err(to))?;

    debug!("Copied {} ({bytes} bytes)", from.display());

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::EntryKind;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    /// Every entry below `root` keyed by relative path, with file contents.
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, (EntryKind, Option<Vec<u8>>)> {
        TreeWalker::new(root)
            .map(|e| {
                let e = e.unwrap();
                let content = (!e.is_dir()).then(|| fs::read(&e.path).unwrap());
                (e.relative_path, (e.kind, content))
            })
            .collect()
    }

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("src/nested/empty")).unwrap();
        fs::write(root.join("README.md"), "# readme\n").unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(root.join("src/nested/blob.bin"), [0u8, 159, 146, 150, 255]).unwrap();
        fs::write(root.join("empty.txt"), "").unwrap();
    }

    #[test]
    fn test_backup_path_for() {
        assert_eq!(
            backup_path_for(Path::new("/a/b/project")),
            PathBuf::from("/a/b/project_bak")
        );
        assert_eq!(
            backup_path_for(Path::new("/a/b/project/")),
            PathBuf::from("/a/b/project_bak")
        );
        assert_eq!(
            backup_path_for(Path::new("project")),
            PathBuf::from("project_bak")
        );
    }

    #[test]
    fn test_copy_mirrors_structure_and_content() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("project");
        fs::create_dir(&source).unwrap();
        sample_tree(&source);

        let destination = backup_path_for(&source);
        let result = copy_tree(&source, &destination).unwrap();

        assert_eq!(result.files_copied, 4);
        assert_eq!(result.dirs_created, 3);
        assert_eq!(result.bytes_copied, 9 + 13 + 5);
        assert_eq!(snapshot(&source), snapshot(&destination));
    }

    #[test]
    fn test_copy_creates_missing_ancestors() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("project");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("file.txt"), "hello").unwrap();

        let destination = temp.path().join("deep/backups/project");
        copy_tree(&source, &destination).unwrap();

        assert_eq!(fs::read(destination.join("file.txt")).unwrap(), b"hello");
    }

    #[test]
    fn test_copy_refuses_existing_destination() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("project");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("file.txt"), "new").unwrap();

        let destination = temp.path().join("project_bak");
        fs::create_dir(&destination).unwrap();
        fs::write(destination.join("old.txt"), "old").unwrap();
        let before = snapshot(&destination);

        let result = copy_tree(&source, &destination);

        assert!(matches!(result, Err(CopyError::AlreadyExists(p)) if p == destination));
        assert_eq!(snapshot(&destination), before);
    }

    #[test]
    fn test_copy_refuses_existing_destination_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("project");
        fs::create_dir(&source).unwrap();

        let destination = temp.path().join("project_bak");
        fs::write(&destination, "in the way").unwrap();

        let result = copy_tree(&source, &destination);

        assert!(matches!(result, Err(CopyError::AlreadyExists(_))));
        assert_eq!(fs::read(&destination).unwrap(), b"in the way");
    }

    #[test]
    fn test_copy_missing_source() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("missing_bak");

        let result = copy_tree(&temp.path().join("missing"), &destination);

        assert!(matches!(result, Err(CopyError::Io { .. })));
        assert!(!destination.exists());
    }

    #[test]
    fn test_copy_source_is_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("file.txt");
        fs::write(&source, "x").unwrap();

        let result = copy_tree(&source, &temp.path().join("file.txt_bak"));

        assert!(matches!(result, Err(CopyError::NotADirectory(_))));
    }

    #[test]
    #[cfg(unix)]
    fn test_copy_stops_at_first_error_and_keeps_partial_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("project");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a_first.txt"), "first").unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", source.join("b_broken")).unwrap();
        fs::write(source.join("c_last.txt"), "last").unwrap();

        let destination = temp.path().join("project_bak");
        let result = copy_tree(&source, &destination);

        assert!(matches!(result, Err(CopyError::Walk(_))));
        assert!(destination.is_dir());
        assert!(!destination.join("c_last.txt").exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_copy_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("project");
        fs::create_dir_all(source.join("sub")).unwrap();

        let destination = temp.path().join("project_bak");
        copy_tree(&source, &destination).unwrap();

        // The process umask can only clear bits.
        let mode = fs::metadata(destination.join("sub")).unwrap().permissions().mode();
        assert_eq!(mode & !0o755 & 0o777, 0);
    }
}
