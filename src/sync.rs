//! Switching a working copy to its default branch and pulling.
//!
//! The version control system sits behind the [`Vcs`] trait so the branch
//! selection logic can be exercised without a real repository.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, info};

/// Tried in order; the first one that exists is used.
pub const DEFAULT_BRANCHES: &[&str] = &["main", "master"];

#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Neither 'main' nor 'master' branches were found")]
    NoDefaultBranch,
    #[error("Error switching to branch '{branch}': {source}")]
    Checkout {
        branch: String,
        #[source]
        source: VcsError,
    },
    #[error("Error pulling latest changes from branch '{branch}': {source}")]
    Pull {
        branch: String,
        #[source]
        source: VcsError,
    },
}

pub trait Vcs {
    fn branch_exists(&self, name: &str) -> bool;
    fn checkout(&self, name: &str) -> Result<(), VcsError>;
    fn pull(&self) -> Result<(), VcsError>;
}

/// Drives the `git` executable found on `PATH` inside one working copy.
pub struct GitCli {
    work_dir: PathBuf,
}

impl GitCli {
    pub fn new(work_dir: &Path) -> Self {
        GitCli {
            work_dir: work_dir.to_path_buf(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.work_dir)
            // Fail instead of hanging on a credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0");
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<(), VcsError> {
        let command = format!("git {}", args.join(" "));
        debug!("Running {command} in {}", self.work_dir.display());

        let output = self
            .command(args)
            .output()
            .map_err(|source| VcsError::Spawn {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(VcsError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Vcs for GitCli {
    fn branch_exists(&self, name: &str) -> bool {
        match self.command(&["rev-parse", "--verify", "--quiet", name]).output() {
            Ok(output) => output.status.success(),
            Err(e) => {
                debug!("Could not run git: {e}");
                false
            }
        }
    }

    fn checkout(&self, name: &str) -> Result<(), VcsError> {
        self.run(&["checkout", name])
    }

    fn pull(&self) -> Result<(), VcsError> {
        self.run(&["pull"])
    }
}

/// Check out the first of [`DEFAULT_BRANCHES`] that exists, then pull.
///
/// Returns the branch that was checked out. Each failing stage has its own
/// error variant so callers can tell a missing branch from a failed checkout
/// or a failed pull.
pub fn sync_repository<V: Vcs + ?Sized>(vcs: &V) -> Result<String, SyncError> {
    let branch = DEFAULT_BRANCHES
        .iter()
        .find(|name| vcs.branch_exists(name))
        .ok_or(SyncError::NoDefaultBranch)?
        .to_string();

    info!("Switching to branch '{branch}'");
    vcs.checkout(&branch).map_err(|source| SyncError::Checkout {
        branch: branch.clone(),
        source,
    })?;

    info!("Pulling latest changes");
    vcs.pull().map_err(|source| SyncError::Pull {
        branch: branch.clone(),
        source,
    })?;

    Ok(branch)
}

/// [`sync_repository`] for the git working copy at `dir`.
pub fn sync_directory(dir: &Path) -> Result<String, SyncError> {
    if !dir.is_dir() {
        return Err(SyncError::NotADirectory(dir.to_path_buf()));
    }

    info!("Updating git repository in {}", dir.display());
    sync_repository(&GitCli::new(dir))
}
