//! Filesystem operations.
//!
//! This module provides the low-level operations the pipeline is built on:
//! - Enumerating the immediate subdirectories of the source root
//! - Copying files with metadata preservation
//! - Recursive, optionally filtered tree copy
//! - The move phase: copy, then clear only what was transported

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::EngineError;
use crate::filter::ExtensionRule;

/// List the immediate subdirectories of `root`, one archive job each.
///
/// Names starting with a dot are treated as hidden and excluded. The result
/// is sorted ascending by name bytes, so manifest order does not depend on
/// platform or locale. Nested directories are not enumerated here; the
/// archiver walks into them.
pub fn list_subdirectories(root: &Path) -> Result<Vec<PathBuf>, EngineError> {
    if !root.is_dir() {
        return Err(EngineError::SourceNotFound {
            path: root.to_path_buf(),
        });
    }

    let entries = fs::read_dir(root).map_err(|e| EngineError::EnumerationFailed {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::EnumerationFailed {
            path: root.to_path_buf(),
            source: e,
        })?;
        let file_type = entry.file_type().map_err(|e| EngineError::EnumerationFailed {
            path: entry.path(),
            source: e,
        })?;
        if !file_type.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        dirs.push(entry.path());
    }

    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(dirs)
}

/// Copy a file from source to destination with metadata preservation.
///
/// Creates the destination's parent directory when needed and carries the
/// source modification time over. Returns the number of bytes copied.
pub fn copy_file_with_metadata(src: &Path, dst: &Path) -> Result<u64, EngineError> {
    ensure_parent_dir_exists(dst)?;

    let mut src_file = fs::File::open(src).map_err(|e| EngineError::ReadError {
        path: src.to_path_buf(),
        source: e,
    })?;

    let src_metadata = src_file.metadata().map_err(|e| EngineError::ReadError {
        path: src.to_path_buf(),
        source: e,
    })?;
    let src_mtime = src_metadata.modified().ok();

    let mut dst_file = fs::File::create(dst).map_err(|e| EngineError::WriteError {
        path: dst.to_path_buf(),
        source: e,
    })?;

    let bytes_copied = io::copy(&mut src_file, &mut dst_file).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            EngineError::WriteError {
                path: dst.to_path_buf(),
                source: e,
            }
        } else {
            EngineError::ReadError {
                path: src.to_path_buf(),
                source: e,
            }
        }
    })?;

    // Preserve modification time if available
    if let Some(mtime) = src_mtime {
        let _ = fs::metadata(dst).and_then(|_| {
            filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime))
        });
    }

    Ok(bytes_copied)
}

/// Ensure the parent directory of a path exists, creating it if necessary.
pub fn ensure_parent_dir_exists(path: &Path) -> Result<(), EngineError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir_exists(parent),
        _ => Ok(()),
    }
}

/// Ensure a directory exists, creating the whole chain if necessary.
///
/// A path that exists but is not a directory is rejected as
/// `DestinationInvalid` rather than silently reused.
pub fn ensure_dir_exists(path: &Path) -> Result<(), EngineError> {
    if let Err(e) = fs::create_dir_all(path) {
        if path.exists() && !path.is_dir() {
            return Err(EngineError::DestinationInvalid {
                path: path.to_path_buf(),
            });
        }
        return Err(EngineError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, restricted by `rule` when given.
///
/// Existing destination files are overwritten. With a rule in force,
/// destination subdirectories that end up holding nothing are removed
/// again; without one the source structure is mirrored exactly, empty
/// directories included. Returns the number of files copied.
pub fn copy_tree(
    src: &Path,
    dst: &Path,
    rule: Option<&ExtensionRule>,
) -> Result<usize, EngineError> {
    let mut copied = Vec::new();
    copy_dir_recursive(src, dst, rule, &mut copied).map_err(copy_phase_error)?;
    Ok(copied.len())
}

/// Relocate `src` into `dst`: copy first, then clear the source.
///
/// Source files are deleted only after every qualifying file has been
/// copied, so a mid-copy failure leaves the source tree untouched.
/// Only transported files are deleted; files excluded by `rule` stay
/// behind, as do the directories holding them. Directories emptied by
/// the deletion are pruned bottom-up, the source root included when it
/// ends up empty. Returns the number of files relocated.
pub fn move_tree(
    src: &Path,
    dst: &Path,
    rule: Option<&ExtensionRule>,
) -> Result<usize, EngineError> {
    let mut copied = Vec::new();
    copy_dir_recursive(src, dst, rule, &mut copied).map_err(move_phase_error)?;

    for file in &copied {
        fs::remove_file(file).map_err(|e| EngineError::MoveError {
            path: file.clone(),
            source: e,
        })?;
    }
    debug!("cleared {} transported files from {}", copied.len(), src.display());

    if prune_empty_dirs(src).map_err(move_phase_error)? {
        fs::remove_dir(src).map_err(|e| EngineError::MoveError {
            path: src.to_path_buf(),
            source: e,
        })?;
        debug!("removed emptied source root {}", src.display());
    }

    Ok(copied.len())
}

/// Depth-first copy. Appends the source path of every file copied to
/// `copied` and reports whether anything below `src` qualified.
fn copy_dir_recursive(
    src: &Path,
    dst: &Path,
    rule: Option<&ExtensionRule>,
    copied: &mut Vec<PathBuf>,
) -> Result<bool, EngineError> {
    ensure_dir_exists(dst)?;

    let entries = fs::read_dir(src).map_err(|e| EngineError::EnumerationFailed {
        path: src.to_path_buf(),
        source: e,
    })?;

    let mut has_files = false;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::EnumerationFailed {
            path: src.to_path_buf(),
            source: e,
        })?;
        let file_type = entry.file_type().map_err(|e| EngineError::EnumerationFailed {
            path: entry.path(),
            source: e,
        })?;
        let src_item = entry.path();
        let dst_item = dst.join(entry.file_name());

        if file_type.is_dir() {
            if copy_dir_recursive(&src_item, &dst_item, rule, copied)? {
                has_files = true;
            } else if rule.is_some() {
                // Filtered copies do not leave hollow directories behind.
                let _ = fs::remove_dir(&dst_item);
            }
        } else if rule.map_or(true, |r| r.allows(&src_item)) {
            copy_file_with_metadata(&src_item, &dst_item)?;
            copied.push(src_item);
            has_files = true;
        }
    }

    Ok(has_files)
}

/// Remove directories under `root` left empty by the move, bottom-up.
/// Returns whether `root` itself is empty afterwards.
fn prune_empty_dirs(root: &Path) -> Result<bool, EngineError> {
    let entries = fs::read_dir(root).map_err(|e| EngineError::EnumerationFailed {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut empty = true;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::EnumerationFailed {
            path: root.to_path_buf(),
            source: e,
        })?;
        let file_type = entry.file_type().map_err(|e| EngineError::EnumerationFailed {
            path: entry.path(),
            source: e,
        })?;
        if file_type.is_dir() {
            if prune_empty_dirs(&entry.path())? {
                fs::remove_dir(entry.path()).map_err(|e| EngineError::MoveError {
                    path: entry.path(),
                    source: e,
                })?;
            } else {
                empty = false;
            }
        } else {
            empty = false;
        }
    }

    Ok(empty)
}

fn copy_phase_error(err: EngineError) -> EngineError {
    match err {
        EngineError::ReadError { path, source }
        | EngineError::WriteError { path, source }
        | EngineError::EnumerationFailed { path, source } => {
            EngineError::CopyError { path, source }
        }
        other => other,
    }
}

fn move_phase_error(err: EngineError) -> EngineError {
    match err {
        EngineError::ReadError { path, source }
        | EngineError::WriteError { path, source }
        | EngineError::EnumerationFailed { path, source }
        | EngineError::CopyError { path, source } => EngineError::MoveError { path, source },
        other => other,
    }
}
