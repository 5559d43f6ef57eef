//! Manifest assembly and sealing.
//!
//! The manifest (`hashes.txt`) lists one line per archive in enumeration
//! order, `<name> <algorithm> <digest>`, and ends with a bare digest line
//! computed over all preceding bytes. That last line never includes itself;
//! a verifier strips it, re-hashes the rest, and compares.

use std::fs;
use std::path::{Path, PathBuf};

use crate::checksums::{digest_bytes, HashAlgorithm};
use crate::error::EngineError;

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "hashes.txt";

/// One recorded archive digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// File name of the archive, without directory components
    pub archive_name: String,

    /// Algorithm the digest was computed with
    pub algorithm: HashAlgorithm,

    /// Lowercase hex digest of the archive bytes
    pub digest: String,
}

impl ManifestEntry {
    fn to_line(&self) -> String {
        format!("{} {} {}", self.archive_name, self.algorithm, self.digest)
    }
}

/// Accumulates entries in processing order and writes the sealed manifest.
///
/// Entries are appended exactly as recorded; no reordering or deduplication
/// happens here. Callers feed archives in enumeration order, which is what
/// makes manifests comparable across runs.
#[derive(Debug)]
pub struct ManifestWriter {
    path: PathBuf,
    algorithm: HashAlgorithm,
    entries: Vec<ManifestEntry>,
}

/// The written manifest and the digest that seals it.
#[derive(Debug)]
pub struct ManifestSeal {
    /// Where the manifest was written
    pub path: PathBuf,

    /// Digest of the manifest body, also its final line
    pub digest: String,
}

impl ManifestWriter {
    pub fn new(output_dir: &Path, algorithm: HashAlgorithm) -> Self {
        ManifestWriter {
            path: output_dir.join(MANIFEST_FILE_NAME),
            algorithm,
            entries: Vec::new(),
        }
    }

    /// Record one archive digest.
    pub fn record(&mut self, archive_name: String, digest: String) {
        self.entries.push(ManifestEntry {
            archive_name,
            algorithm: self.algorithm,
            digest,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path the manifest will be written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the manifest and seal it.
    ///
    /// The sealing digest is computed over the entry lines only, then both
    /// sections go to disk in a single write. A manifest with zero entries
    /// is still sealed (the digest of zero bytes).
    pub fn finalize(self) -> Result<ManifestSeal, EngineError> {
        let mut body = String::new();
        for entry in &self.entries {
            body.push_str(&entry.to_line());
            body.push('\n');
        }

        let digest = digest_bytes(body.as_bytes(), self.algorithm);

        let mut content = body;
        content.push_str(&digest);
        content.push('\n');

        fs::write(&self.path, content).map_err(|e| EngineError::WriteError {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(ManifestSeal {
            path: self.path,
            digest,
        })
    }
}

/// Check a sealed manifest: recompute the digest of everything before the
/// final line and compare it against that line.
pub fn verify_manifest(path: &Path, algorithm: HashAlgorithm) -> Result<bool, EngineError> {
    let content = fs::read_to_string(path).map_err(|e| EngineError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let trimmed = content.strip_suffix('\n').unwrap_or(&content);
    let (body, claimed) = match trimmed.rfind('\n') {
        Some(pos) => (&content[..pos + 1], &trimmed[pos + 1..]),
        None => ("", trimmed),
    };

    Ok(digest_bytes(body.as_bytes(), algorithm) == claimed)
}
