//! Zip archive construction.
//!
//! One archive per subdirectory, with reproducibility as the contract:
//! identical input trees and filter configuration must yield byte-identical
//! archives, because the manifest digests are computed over archive bytes.
//! Three measures keep the output stable: entries are sorted by relative
//! path, every entry carries a fixed timestamp instead of the source mtime,
//! and permissions are normalized. Archives are written to a temporary
//! sibling and renamed into place, so an interrupted run never leaves a
//! half-written `.zip` behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::EngineError;
use crate::filter::ExtensionRule;
use crate::model::ArchiveJob;

/// A finished archive on disk.
#[derive(Debug)]
pub struct WrittenArchive {
    /// Final location of the archive
    pub path: PathBuf,

    /// Number of files packed
    pub files: usize,

    /// Size of the archive in bytes
    pub bytes: u64,
}

/// Build the archive for one job.
///
/// Walks the job's directory recursively and packs every file that passes
/// the rule (all files when the job does not apply the filter), preserving
/// relative paths. Returns `Ok(None)` when no file qualifies and
/// `skip_empty` is set; otherwise an archive is written even when empty.
pub fn archive_directory(
    job: &ArchiveJob,
    rule: &ExtensionRule,
    skip_empty: bool,
) -> Result<Option<WrittenArchive>, EngineError> {
    let files = collect_files(job, rule)?;

    if skip_empty && files.is_empty() {
        return Ok(None);
    }

    let tmp_path = job.archive_path.with_extension("zip.tmp");
    if let Err(e) = write_zip(&tmp_path, &files) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, &job.archive_path).map_err(|e| EngineError::ArchiveIo {
        path: job.archive_path.clone(),
        source: e,
    })?;

    let bytes = fs::metadata(&job.archive_path)
        .map_err(|e| EngineError::ArchiveIo {
            path: job.archive_path.clone(),
            source: e,
        })?
        .len();

    Ok(Some(WrittenArchive {
        path: job.archive_path.clone(),
        files: files.len(),
        bytes,
    }))
}

/// Gather the files to pack, as (source path, archive entry name) pairs
/// sorted by entry name so archive layout never depends on directory
/// iteration order.
fn collect_files(
    job: &ArchiveJob,
    rule: &ExtensionRule,
) -> Result<Vec<(PathBuf, String)>, EngineError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(&job.source_dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| job.source_dir.clone());
            EngineError::EnumerationFailed {
                path,
                source: e.into(),
            }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        if !rule.include(entry.path(), job.applies_filter) {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(&job.source_dir)
            .map_err(|_| EngineError::ArchiveIo {
                path: entry.path().to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "entry outside archive root"),
            })?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push((entry.path().to_path_buf(), name));
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

fn write_zip(tmp_path: &Path, files: &[(PathBuf, String)]) -> Result<(), EngineError> {
    let out = fs::File::create(tmp_path).map_err(|e| EngineError::ArchiveIo {
        path: tmp_path.to_path_buf(),
        source: e,
    })?;
    let mut writer = ZipWriter::new(out);

    // Fixed timestamp and permissions keep archive bytes independent of
    // source mtimes and umask.
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    for (path, name) in files {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| zip_error(tmp_path, e))?;
        let mut src = fs::File::open(path).map_err(|e| EngineError::ArchiveIo {
            path: path.clone(),
            source: e,
        })?;
        io::copy(&mut src, &mut writer).map_err(|e| EngineError::ArchiveIo {
            path: path.clone(),
            source: e,
        })?;
    }

    writer.finish().map_err(|e| zip_error(tmp_path, e))?;
    Ok(())
}

fn zip_error(path: &Path, err: ZipError) -> EngineError {
    let source = match err {
        ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other),
    };
    EngineError::ArchiveIo {
        path: path.to_path_buf(),
        source,
    }
}
