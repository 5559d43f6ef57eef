//! Core data model for archiving runs.
//!
//! This module defines the main data structures for representing one run of
//! the pipeline:
//! - RunConfig: the parsed options controlling a run
//! - ArchiveJob: one subdirectory to be zipped
//! - JobResult / JobOutcome: what happened to each subdirectory
//! - RunReport: the completed run, for summary output

use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::checksums::HashAlgorithm;

/// Options controlling a single run.
///
/// One RunConfig drives the whole pipeline: enumerate subdirectories of
/// `source`, archive each into `destination`, seal the manifest, then
/// optionally mirror to `secondary_copy` and clear the source.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Root directory whose immediate subdirectories are archived
    pub source: PathBuf,

    /// Directory receiving the archives and the manifest
    pub destination: PathBuf,

    /// Optional second location that receives the archives and a copy
    /// of the source tree
    pub secondary_copy: Option<PathBuf>,

    /// Digest algorithm for archive hashing and the manifest seal
    pub algorithm: HashAlgorithm,

    /// Restrict archive contents to the known-extension catalogue
    pub filter_zip: bool,

    /// Restrict the secondary source copy to the known-extension catalogue
    pub filter_copy: bool,

    /// Restrict the move phase to the known-extension catalogue
    pub filter_move: bool,

    /// Skip subdirectories that contain no eligible files instead of
    /// writing an empty archive
    pub skip_empty: bool,

    /// Clear transported files from the source after archiving
    pub move_source: bool,

    /// Ask the operator for a subdirectory name and nest all output
    /// under destination/<name>
    pub prompt_subdir: bool,

    /// Suppress the move confirmation prompt
    pub skip_confirmation: bool,

    /// Emit per-step diagnostics
    pub debug: bool,
}

/// One subdirectory queued for archiving.
#[derive(Debug, Clone)]
pub struct ArchiveJob {
    /// Unique identifier for this job
    pub id: Uuid,

    /// The subdirectory whose contents are zipped
    pub source_dir: PathBuf,

    /// Where the finished archive lands
    pub archive_path: PathBuf,

    /// Whether the extension catalogue limits which files are packed
    pub applies_filter: bool,
}

impl ArchiveJob {
    pub fn new(source_dir: PathBuf, archive_path: PathBuf, applies_filter: bool) -> Self {
        ArchiveJob {
            id: Uuid::new_v4(),
            source_dir,
            archive_path,
            applies_filter,
        }
    }
}

/// What happened to one subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// An archive was written and hashed
    Archived {
        archive_path: PathBuf,
        file_count: usize,
        archive_bytes: u64,
        digest: String,
    },
    /// The subdirectory held no eligible files and skipping was requested
    SkippedEmpty,
}

/// Result for one enumerated subdirectory.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// Name of the subdirectory under the source root
    pub directory: String,

    /// Outcome of the archiving attempt
    pub outcome: JobOutcome,
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Source root that was processed
    pub source: PathBuf,

    /// Directory the archives and manifest were written to
    pub output_dir: PathBuf,

    /// Per-subdirectory results, in processing order
    pub jobs: Vec<JobResult>,

    /// Path of the sealed manifest
    pub manifest_path: PathBuf,

    /// Digest of the manifest body, also its last line
    pub final_digest: String,

    /// Algorithm used throughout the run
    pub algorithm: HashAlgorithm,

    /// Files written by the secondary copy phase
    pub copied_files: usize,

    /// Files cleared from the source by the move phase
    pub moved_files: usize,

    /// When the run started
    pub started_at: SystemTime,

    /// When the run finished
    pub finished_at: SystemTime,
}

impl RunReport {
    /// Number of subdirectories that produced an archive.
    pub fn archived_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| matches!(j.outcome, JobOutcome::Archived { .. }))
            .count()
    }

    /// Number of subdirectories skipped as empty.
    pub fn skipped_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.outcome == JobOutcome::SkippedEmpty)
            .count()
    }

    /// Total bytes across all written archives.
    pub fn archive_bytes(&self) -> u64 {
        self.jobs
            .iter()
            .map(|j| match &j.outcome {
                JobOutcome::Archived { archive_bytes, .. } => *archive_bytes,
                JobOutcome::SkippedEmpty => 0,
            })
            .sum()
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> Duration {
        self.finished_at
            .duration_since(self.started_at)
            .unwrap_or(Duration::ZERO)
    }
}
