//! Cross-process single-instance locking.
//!
//! Two concurrent runs writing the same destination would interleave
//! archives and manifest entries, so the whole pipeline sits behind one
//! exclusive marker file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, warn};

use crate::error::EngineError;

/// Exclusive marker whose presence signals an active run.
///
/// The marker is claimed with an atomic create-new open, so two processes
/// racing past an existence check cannot both win. The file records the
/// owning PID. The marker is removed on release (and on drop), but a run
/// killed hard leaves it behind; recovery is deliberately manual: check
/// whether the recorded PID is still alive, then delete the marker.
/// Silent auto-removal could let two live runs proceed concurrently.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    released: bool,
}

impl InstanceLock {
    /// Claim the marker at its default location.
    pub fn acquire() -> Result<Self, EngineError> {
        Self::acquire_at(&Self::default_path())
    }

    /// Default marker location: `ziphash.lock` in the system temp directory.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join("ziphash.lock")
    }

    /// Claim the marker at an explicit path.
    ///
    /// Fails with `LockHeld` when the marker already exists, reporting the
    /// recorded holder PID when it can be read.
    pub fn acquire_at(path: &Path) -> Result<Self, EngineError> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                // Losing the PID annotation is tolerable; losing the lock is not.
                if let Err(e) = write!(file, "{}", process::id()) {
                    warn!("could not record pid in lock marker: {}", e);
                }
                debug!("lock marker claimed at {}", path.display());
                Ok(InstanceLock {
                    path: path.to_path_buf(),
                    released: false,
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(EngineError::LockHeld {
                path: path.to_path_buf(),
                holder: Self::read_holder(path),
            }),
            Err(e) => Err(EngineError::WriteError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn read_holder(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    /// Location of the held marker.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker. Idempotent; also runs on drop, so the marker is
    /// cleared on every exit path the process survives long enough to unwind.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("lock marker released at {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "could not remove lock marker {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        self.release();
    }
}
