//! Error types for the archiving engine.
//!
//! The primary error type is `EngineError`, which represents run-level errors
//! that stop the pipeline. The pipeline is fail-fast: an archive set with
//! missing entries would misrepresent what the manifest claims to cover, so
//! there is no per-file skip-and-continue tier.

use std::fmt::{Display, self};
use std::path::PathBuf;
use std::io;
use std::error::Error;

/// Errors that stop a run.
///
/// Variants carry the path they relate to and, where one exists, the
/// underlying OS error, so the operator can tell which phase failed on
/// which file without consulting the log.
///
/// `UserAborted` is the one non-failure variant: a clean early termination
/// requested at a confirmation prompt. Callers map it to its own exit code.
#[derive(Debug)]
pub enum EngineError {
    /// Another instance holds the lock marker
    LockHeld { path: PathBuf, holder: Option<u32> },

    /// Source directory does not exist or is not a directory
    SourceNotFound { path: PathBuf },

    /// Destination (or secondary copy target) exists but is not a directory
    DestinationInvalid { path: PathBuf },

    /// Hash algorithm name is not recognized
    UnsupportedAlgorithm { name: String },

    /// Failed to write a zip archive
    ArchiveIo { path: PathBuf, source: io::Error },

    /// Failed to read from a source file
    ReadError { path: PathBuf, source: io::Error },

    /// Failed to write to a destination file
    WriteError { path: PathBuf, source: io::Error },

    /// Failed to create a directory
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Failed to enumerate a directory
    EnumerationFailed { path: PathBuf, source: io::Error },

    /// Secondary copy phase failed
    CopyError { path: PathBuf, source: io::Error },

    /// Move phase failed while clearing transported files
    MoveError { path: PathBuf, source: io::Error },

    /// Operator declined (or could not answer) a confirmation prompt
    UserAborted,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockHeld { path, holder } => match holder {
                Some(pid) => write!(
                    f,
                    "Another run is active (lock marker {} held by pid {})",
                    path.display(),
                    pid
                ),
                None => write!(f, "Another run is active (lock marker {})", path.display()),
            },
            Self::SourceNotFound { path } => {
                write!(f, "Source directory not found: {}", path.display())
            }
            Self::DestinationInvalid { path } => {
                write!(f, "Not a usable directory: {}", path.display())
            }
            Self::UnsupportedAlgorithm { name } => {
                write!(f, "Unsupported hash algorithm: {}", name)
            }
            Self::ArchiveIo { path, .. } => {
                write!(f, "Failed to write archive: {}", path.display())
            }
            Self::ReadError { path, .. } => {
                write!(f, "Failed to read file: {}", path.display())
            }
            Self::WriteError { path, .. } => {
                write!(f, "Failed to write file: {}", path.display())
            }
            Self::DirectoryCreationFailed { path, .. } => {
                write!(f, "Failed to create directory: {}", path.display())
            }
            Self::EnumerationFailed { path, .. } => {
                write!(f, "Failed to enumerate directory: {}", path.display())
            }
            Self::CopyError { path, .. } => {
                write!(f, "Copy failed at: {}", path.display())
            }
            Self::MoveError { path, .. } => {
                write!(f, "Move failed at: {}", path.display())
            }
            Self::UserAborted => write!(f, "Aborted by operator"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ArchiveIo { source, .. }
            | Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::EnumerationFailed { source, .. }
            | Self::CopyError { source, .. }
            | Self::MoveError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<u32> {
        match self {
            Self::ArchiveIo { source, .. }
            | Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::EnumerationFailed { source, .. }
            | Self::CopyError { source, .. }
            | Self::MoveError { source, .. } => {
                source.raw_os_error().map(|e| e as u32)
            }
            _ => None,
        }
    }

    /// True when the run ended at an operator prompt rather than on a failure.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::UserAborted)
    }
}
