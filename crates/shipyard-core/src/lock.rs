//! Exclusive lock that keeps overlapping release runs apart.
//!
//! The lock is a plain file created with `create_new`, so acquiring it is
//! atomic on every platform. It holds the owning process id and is removed
//! when the guard drops.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::git;

/// Lock file name inside the git directory.
pub const LOCK_FILE_NAME: &str = "shipyard-release.lock";

/// Errors from taking the run lock.
#[derive(Error, Debug)]
pub enum LockError {
    /// Another run already holds the lock.
    #[error("another release run holds `{path}` (owner: {owner}); remove it if that run is gone")]
    Held {
        /// Path of the lock file.
        path: Utf8PathBuf,
        /// Contents of the lock file.
        owner: String,
    },

    /// The lock file could not be created.
    #[error("failed to create lock file `{path}`")]
    Io {
        /// Path of the lock file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Where the lock lives for a project root.
///
/// Inside the repository's common git directory when `root` is in a
/// repository, so every worktree and package directory shares one lock.
/// Otherwise a dotfile in the root itself.
pub fn lock_path(root: &Utf8Path) -> Utf8PathBuf {
    match git::git_common_dir(root) {
        Ok(Some(dir)) => dir.join(LOCK_FILE_NAME),
        Ok(None) => root.join(format!(".{LOCK_FILE_NAME}")),
        Err(e) => {
            debug!(error = %e, "git directory unknown, locking in the project root");
            root.join(format!(".{LOCK_FILE_NAME}"))
        }
    }
}

/// A held run lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct RunLock {
    path: Utf8PathBuf,
}

impl RunLock {
    /// Take the lock at `path`, failing fast if it is already held.
    pub fn acquire(path: &Utf8Path) -> LockResult<Self> {
        let io_err = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let owner = std::fs::read_to_string(path)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                return Err(LockError::Held {
                    path: path.to_path_buf(),
                    owner: if owner.is_empty() {
                        "unknown".to_string()
                    } else {
                        owner
                    },
                });
            }
            Err(e) => return Err(io_err(e)),
        };

        writeln!(file, "pid {}", std::process::id()).map_err(io_err)?;
        debug!(%path, "acquired run lock");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path, error = %e, "failed to remove run lock");
        } else {
            debug!(path = %self.path, "released run lock");
        }
    }
}
