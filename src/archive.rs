//! Zip archival of a directory tree.
//!
//! Entry names are relative to the parent of the archived directory, so
//! archiving `/a/b/project_bak` yields entries such as `project_bak/` and
//! `project_bak/src/main.rs`. Extracting the archive next to the original
//! recreates the tree under its own name.

use crate::copy::BACKUP_SUFFIX;
use crate::walk::{TreeWalker, WalkError};
use chrono::Local;
use std::fs::{File, Metadata};
use std::io::{Seek, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ARCHIVE_EXTENSION: &str = "zip";

/// Entries at or above this size need zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Directory walk error: {0}")]
    Walk(#[from] WalkError),
    #[error("Failed to archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Cannot name archive entry for {0}")]
    InvalidName(PathBuf),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ArchiveResult {
    /// Directory entries written, including the archived directory itself.
    pub dirs: usize,
    pub files: usize,
}

/// Where the archive of `target` goes: `<parent>/<name>.zip`, with the backup
/// suffix removed from `name`.
pub fn archive_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = match name.strip_suffix(BACKUP_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem,
        _ => {
            warn!(
                "{} does not end in {BACKUP_SUFFIX}, archive keeps the directory name",
                target.display()
            );
            name.as_str()
        }
    };

    target.with_file_name(format!("{stem}.{ARCHIVE_EXTENSION}"))
}

/// Write the directory `source` and everything below it to a new zip file at
/// `archive_path`.
///
/// Directories are stored as empty entries whose names end in `/`; files are
/// deflated. The zip writer is finished exactly once, even when the walk
/// fails; in that case the walk's error is returned and the truncated archive
/// stays on disk.
pub fn archive_tree(source: &Path, archive_path: &Path) -> Result<ArchiveResult, ArchiveError> {
    info!(
        "Compressing {} into {}",
        source.display(),
        archive_path.display()
    );

    let file = File::create(archive_path).map_err(|e| ArchiveError::Io {
        path: archive_path.to_path_buf(),
        source: e,
    })?;

    let result = write_archive(file, source)?;

    info!(
        "Archived {} files in {} directories",
        result.files, result.dirs
    );

    Ok(result)
}

fn write_archive<W: Write + Seek>(sink: W, source: &Path) -> Result<ArchiveResult, ArchiveError> {
    let base = source.parent().unwrap_or(Path::new(""));
    let mut zip = ZipWriter::new(sink);

    let written = write_entries(&mut zip, source, base);
    let finished = zip.finish();

    match (written, finished) {
        (Ok(result), Ok(_)) => Ok(result),
        (Ok(_), Err(e)) => Err(ArchiveError::Zip(e)),
        (Err(e), Ok(_)) => Err(e),
        (Err(e), Err(finish_err)) => {
            warn!(
                "Failed to finalize archive of {} after error: {finish_err}",
                source.display()
            );
            Err(e)
        }
    }
}

fn write_entries<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    source: &Path,
    base: &Path,
) -> Result<ArchiveResult, ArchiveError> {
    let mut result = ArchiveResult::default();

    let root_metadata = std::fs::metadata(source).map_err(|e| WalkError::from_io(source, e))?;
    zip.add_directory(dir_entry_name(base, source)?, dir_options(&root_metadata))?;
    result.dirs += 1;

    for entry in TreeWalker::new(source) {
        let entry = entry?;
        let io_err = |e: std::io::Error| ArchiveError::Io {
            path: entry.path.clone(),
            source: e,
        };

        if entry.is_dir() {
            let name = dir_entry_name(base, &entry.path)?;
            let metadata = std::fs::metadata(&entry.path).map_err(io_err)?;
            debug!("Adding {name}");
            zip.add_directory(name, dir_options(&metadata))?;
            result.dirs += 1;
            continue;
        }

        let name = entry_name(base, &entry.path)?;
        let mut reader = File::open(&entry.path).map_err(io_err)?;
        let metadata = reader.metadata().map_err(io_err)?;

        debug!("Adding {name} ({} bytes)", metadata.len());
        zip.start_file(name, file_options(&metadata))?;
        std::io::copy(&mut reader, &mut *zip).map_err(io_err)?;
        result.files += 1;
    }

    Ok(result)
}

fn dir_options(metadata: &Metadata) -> SimpleFileOptions {
    header_options(metadata).compression_method(CompressionMethod::Stored)
}

fn file_options(metadata: &Metadata) -> SimpleFileOptions {
    header_options(metadata)
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= ZIP64_THRESHOLD)
}

/// Modification time and unix mode of the entry, as `zip` and `unzip`
/// restore them.
fn header_options(metadata: &Metadata) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default();

    if let Some(modified) = zip_timestamp(metadata) {
        options = options.last_modified_time(modified);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options = options.unix_permissions(metadata.permissions().mode());
    }

    options
}

/// Zip timestamps are local time with two second resolution, from 1980 to
/// 2107. Anything outside that range keeps the writer's default.
fn zip_timestamp(metadata: &Metadata) -> Option<zip::DateTime> {
    let modified = metadata.modified().ok()?;
    let local = chrono::DateTime::<Local>::from(modified).naive_local();
    zip::DateTime::try_from(local).ok()
}

/// The `/`-separated name of `path` relative to `base`.
fn entry_name(base: &Path, path: &Path) -> Result<String, ArchiveError> {
    let invalid = || ArchiveError::InvalidName(path.to_path_buf());

    let relative = path.strip_prefix(base).map_err(|_| invalid())?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(invalid)?),
            Component::CurDir => {}
            _ => return Err(invalid()),
        }
    }

    if parts.is_empty() {
        return Err(invalid());
    }

    Ok(parts.join("/"))
}

fn dir_entry_name(base: &Path, path: &Path) -> Result<String, ArchiveError> {
    Ok(entry_name(base, path)? + "/")
}
