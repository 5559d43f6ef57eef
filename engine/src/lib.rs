//! # ZipHash Engine - Directory Archiving Library
//!
//! A headless archive-and-verify engine in Rust.
//! Designed as the foundation for multiple frontends (CLI, automation).
//!
//! ## Overview
//!
//! The engine archives each immediate subdirectory of a source root into its
//! own zip file, hashes every archive, and seals the results in a manifest.
//! It features:
//! - Deterministic zip output (stable entry order, fixed metadata)
//! - Streaming checksums over five algorithms
//! - A sealed manifest whose last line authenticates the lines above it
//! - Optional secondary copy and guarded source move
//! - Single-instance locking via a marker file
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{execute, HashAlgorithm, InstanceLock, Prompter, RunConfig};
//! use std::path::{Path, PathBuf};
//!
//! struct AlwaysYes;
//!
//! impl Prompter for AlwaysYes {
//!     fn confirm_move(&self, _source: &Path, _destination: &Path) -> bool {
//!         true
//!     }
//!     fn subdirectory_name(&self) -> Option<String> {
//!         None
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Claim the single-instance lock
//! let lock = InstanceLock::acquire()?;
//!
//! // Describe the run
//! let config = RunConfig {
//!     source: PathBuf::from("/data/projects"),
//!     destination: PathBuf::from("/backups/out"),
//!     algorithm: HashAlgorithm::Sha3_256,
//!     ..Default::default()
//! };
//!
//! // Archive, hash, and seal
//! let report = execute(&lock, &config, &AlwaysYes)?;
//! println!(
//!     "{} archives written, final hash {}",
//!     report.archived_count(),
//!     report.final_digest
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (RunConfig, ArchiveJob, RunReport)
//! - **error**: Error types and handling
//! - **filter**: The known-extension catalogue and per-phase filtering
//! - **fs_ops**: Low-level filesystem operations (enumerate, copy, move)
//! - **archive**: Deterministic zip writing
//! - **checksums**: Checksum computation over files and byte slices
//! - **manifest**: Manifest recording, sealing, and verification
//! - **lock**: Single-instance marker lock
//! - **gate**: Prompter trait and the move confirmation gate
//! - **job**: Run orchestration

pub mod model;
pub mod error;
pub mod filter;
pub mod fs_ops;
pub mod archive;
pub mod checksums;
pub mod manifest;
pub mod lock;
pub mod gate;
pub mod job;

// Re-export main types and functions
pub use model::{RunConfig, ArchiveJob, JobResult, JobOutcome, RunReport};
pub use error::EngineError;
pub use filter::ExtensionRule;
pub use archive::WrittenArchive;
pub use checksums::{HashAlgorithm, ChecksumHasher, create_hasher, digest_file, digest_bytes, ALGORITHM_NAMES};
pub use manifest::{ManifestWriter, ManifestSeal, ManifestEntry, verify_manifest, MANIFEST_FILE_NAME};
pub use lock::InstanceLock;
pub use gate::{Prompter, authorize_move};
pub use job::execute;
