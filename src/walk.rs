//! Depth-bounded, pre-order directory walking.
//!
//! [`TreeWalker`] yields every entry below a root directory exactly once. A
//! directory is always yielded before its children, and its children are
//! fully visited before the walk moves on to the directory's next sibling.
//! Entries within one directory come out in name order so that a walk over
//! an unchanged tree is repeatable.
//!
//! The walk is driven by an explicit stack rather than recursion, and it
//! lists a directory only when the caller asks for the next entry after it.
//! That gives callers the chance to call [`TreeWalker::skip_current_dir`] to
//! keep the walker out of a subtree they are about to modify.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WalkError {
    pub(crate) fn from_io(path: &Path, e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            WalkError::PermissionDenied(path.to_path_buf())
        } else {
            WalkError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Only produced when links are not followed.
    Symlink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// The walk root joined with `relative_path`.
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub kind: EntryKind,
    /// Children of the walk root have depth 1.
    pub depth: usize,
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// A directory whose children have not been listed yet.
struct PendingDir {
    path: PathBuf,
    relative_path: PathBuf,
    depth: usize,
}

pub struct TreeWalker {
    max_depth: Option<usize>,
    follow_links: bool,
    stack: Vec<std::vec::IntoIter<TreeEntry>>,
    pending: Option<PendingDir>,
    done: bool,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TreeWalker {
            max_depth: None,
            follow_links: true,
            stack: Vec::new(),
            pending: Some(PendingDir {
                path: root.into(),
                relative_path: PathBuf::new(),
                depth: 0,
            }),
            done: false,
        }
    }

    /// Never descend into directories at `depth` or deeper. With a maximum
    /// depth of 3, entries at depths 1 to 3 are yielded.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        if depth == 0 {
            self.pending = None;
        }
        self
    }

    /// Whether symlinks are resolved (the default). When off, every link is
    /// yielded as [`EntryKind::Symlink`] and never descended into, and a
    /// dangling link is not an error.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Do not descend into the directory most recently yielded.
    ///
    /// Has no effect if the last entry was a file or its children were
    /// already listed.
    pub fn skip_current_dir(&mut self) {
        self.pending = None;
    }

    fn can_descend(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }

    fn fail(&mut self, err: WalkError) -> Option<Result<TreeEntry, WalkError>> {
        self.done = true;
        self.stack.clear();
        self.pending = None;
        Some(Err(err))
    }
}

impl Iterator for TreeWalker {
    type Item = Result<TreeEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(dir) = self.pending.take() {
            match list_children(&dir, self.follow_links) {
                Ok(children) => self.stack.push(children.into_iter()),
                Err(e) => return self.fail(e),
            }
        }

        loop {
            let Some(top) = self.stack.last_mut() else {
                self.done = true;
                return None;
            };

            let Some(entry) = top.next() else {
                self.stack.pop();
                continue;
            };

            if entry.is_dir() && self.can_descend(entry.depth) {
                self.pending = Some(PendingDir {
                    path: entry.path.clone(),
                    relative_path: entry.relative_path.clone(),
                    depth: entry.depth,
                });
            }

            return Some(Ok(entry));
        }
    }
}

fn list_children(dir: &PendingDir, follow_links: bool) -> Result<Vec<TreeEntry>, WalkError> {
    let read_dir = std::fs::read_dir(&dir.path).map_err(|e| WalkError::from_io(&dir.path, e))?;

    let mut entries = Vec::new();

    for entry in read_dir {
        let entry = entry.map_err(|e| WalkError::from_io(&dir.path, e))?;
        let name = entry.file_name();
        let path = dir.path.join(&name);

        let kind = if follow_links {
            let metadata = std::fs::metadata(&path).map_err(|e| WalkError::from_io(&path, e))?;
            if metadata.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            }
        } else {
            // DirEntry::file_type does not traverse links.
            let file_type = entry.file_type().map_err(|e| WalkError::from_io(&path, e))?;
            if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            }
        };

        entries.push(TreeEntry {
            relative_path: dir.relative_path.join(&name),
            path,
            kind,
            depth: dir.depth + 1,
        });
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(entries)
}
