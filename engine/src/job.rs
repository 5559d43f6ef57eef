//! Run orchestration.
//!
//! `execute` drives one full run in a fixed order: validate paths, resolve
//! the output directory, archive each subdirectory and record its digest,
//! seal the manifest, mirror everything to the secondary location, then
//! gate and perform the move. Any failure stops the run where it stands;
//! a manifest describing half the archives would be worse than no manifest.

use std::time::SystemTime;

use tracing::{debug, info};
use uuid::Uuid;

use crate::archive;
use crate::checksums::digest_file;
use crate::error::EngineError;
use crate::filter::ExtensionRule;
use crate::fs_ops;
use crate::gate::{self, Prompter};
use crate::lock::InstanceLock;
use crate::manifest::ManifestWriter;
use crate::model::{ArchiveJob, JobOutcome, JobResult, RunConfig, RunReport};

/// Execute one run.
///
/// Requires the instance lock as a parameter so mutual exclusion is claimed
/// before any filesystem work can start. The prompter answers the optional
/// subdirectory question and guards the move phase.
pub fn execute(
    lock: &InstanceLock,
    config: &RunConfig,
    prompter: &dyn Prompter,
) -> Result<RunReport, EngineError> {
    let id = Uuid::new_v4();
    let started_at = SystemTime::now();
    debug!("run {} under lock marker {}", id, lock.path().display());

    // Path validation happens before anything is created or written.
    if !config.source.is_dir() {
        return Err(EngineError::SourceNotFound {
            path: config.source.clone(),
        });
    }
    if config.destination.exists() && !config.destination.is_dir() {
        return Err(EngineError::DestinationInvalid {
            path: config.destination.clone(),
        });
    }
    if let Some(secondary) = &config.secondary_copy {
        if secondary.exists() && !secondary.is_dir() {
            return Err(EngineError::DestinationInvalid {
                path: secondary.clone(),
            });
        }
    }
    fs_ops::ensure_dir_exists(&config.destination)?;
    if let Some(secondary) = &config.secondary_copy {
        fs_ops::ensure_dir_exists(secondary)?;
    }

    let sub_name = if config.prompt_subdir {
        match prompter.subdirectory_name() {
            Some(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
            // Empty or unanswerable input aborts rather than silently
            // dropping output into the destination root.
            _ => return Err(EngineError::UserAborted),
        }
    } else {
        None
    };

    let output_dir = match &sub_name {
        Some(name) => {
            let nested = config.destination.join(name);
            fs_ops::ensure_dir_exists(&nested)?;
            nested
        }
        None => config.destination.clone(),
    };

    info!(
        "starting zip process for {} into {} ({} filter)",
        config.source.display(),
        output_dir.display(),
        if config.filter_zip { "with" } else { "without" }
    );

    let rule = ExtensionRule::default();
    let mut writer = ManifestWriter::new(&output_dir, config.algorithm);
    let mut jobs = Vec::new();

    for dir in fs_ops::list_subdirectories(&config.source)? {
        let directory = dir.file_name().unwrap_or_default().to_string_lossy().to_string();
        let archive_name = format!("{}.zip", directory);
        let job = ArchiveJob::new(dir.clone(), output_dir.join(&archive_name), config.filter_zip);

        match archive::archive_directory(&job, &rule, config.skip_empty)? {
            Some(written) => {
                let digest = digest_file(&written.path, config.algorithm)?;
                debug!(
                    "zip {} written ({} files); hash ({}): {}",
                    archive_name, written.files, config.algorithm, digest
                );
                writer.record(archive_name, digest.clone());
                jobs.push(JobResult {
                    directory,
                    outcome: JobOutcome::Archived {
                        archive_path: written.path,
                        file_count: written.files,
                        archive_bytes: written.bytes,
                        digest,
                    },
                });
            }
            None => {
                info!(
                    "directory {} not zipped (empty or fully filtered)",
                    dir.display()
                );
                jobs.push(JobResult {
                    directory,
                    outcome: JobOutcome::SkippedEmpty,
                });
            }
        }
    }

    info!("zip process completed ({} directories zipped)", writer.len());

    let seal = writer.finalize()?;
    info!("final hash ({}): {}", config.algorithm, seal.digest);

    let mut copied_files = 0;
    if let Some(secondary) = &config.secondary_copy {
        let copy_dir = match &sub_name {
            Some(name) => {
                let nested = secondary.join(name);
                fs_ops::ensure_dir_exists(&nested)?;
                nested
            }
            None => secondary.clone(),
        };
        debug!(
            "copying archives and source into {} ({} filter)",
            copy_dir.display(),
            if config.filter_copy { "with" } else { "without" }
        );
        // The archive set goes over unfiltered; only the source copy
        // honors the copy-phase filter.
        copied_files += fs_ops::copy_tree(&output_dir, &copy_dir, None)?;
        let copy_rule = config.filter_copy.then_some(&rule);
        copied_files += fs_ops::copy_tree(&config.source, &copy_dir, copy_rule)?;
        info!("copy process completed into {}", copy_dir.display());
    }

    let mut moved_files = 0;
    if config.move_source {
        // The gate comes first: a declined prompt must leave the source
        // untouched, so not a single byte moves before the answer.
        gate::authorize_move(prompter, config.skip_confirmation, &config.source, &output_dir)?;
        debug!(
            "moving source into {} ({} filter)",
            output_dir.display(),
            if config.filter_move { "with" } else { "without" }
        );
        let move_rule = config.filter_move.then_some(&rule);
        moved_files = fs_ops::move_tree(&config.source, &output_dir, move_rule)?;
        info!("move process completed into {}", output_dir.display());
    }

    info!("process completed successfully");

    Ok(RunReport {
        id,
        source: config.source.clone(),
        output_dir,
        jobs,
        manifest_path: seal.path,
        final_digest: seal.digest,
        algorithm: config.algorithm,
        copied_files,
        moved_files,
        started_at,
        finished_at: SystemTime::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{verify_manifest, MANIFEST_FILE_NAME};
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    struct ScriptedPrompter {
        confirm: bool,
        sub: Option<String>,
    }

    impl ScriptedPrompter {
        fn silent() -> Self {
            ScriptedPrompter {
                confirm: false,
                sub: None,
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn confirm_move(&self, _source: &Path, _destination: &Path) -> bool {
            self.confirm
        }

        fn subdirectory_name(&self) -> Option<String> {
            self.sub.clone()
        }
    }

    fn write_file(path: &Path, content: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        let mut file = fs::File::create(path).expect("Failed to create file");
        file.write_all(content).expect("Failed to write file");
    }

    fn acquire_lock(dir: &Path) -> InstanceLock {
        InstanceLock::acquire_at(&dir.join("test.lock")).expect("Failed to acquire lock")
    }

    fn config(source: PathBuf, destination: PathBuf) -> RunConfig {
        RunConfig {
            source,
            destination,
            ..Default::default()
        }
    }

    #[test]
    fn test_execute_archives_each_subdirectory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        write_file(&src.join("a").join("one.txt"), b"one");
        write_file(&src.join("b").join("two.txt"), b"two");

        let lock = acquire_lock(temp_dir.path());
        let report = execute(&lock, &config(src, dst.clone()), &ScriptedPrompter::silent())
            .expect("run should succeed");

        assert_eq!(report.archived_count(), 2);
        assert_eq!(report.skipped_count(), 0);
        assert!(dst.join("a.zip").exists());
        assert!(dst.join("b.zip").exists());
        assert_eq!(report.manifest_path, dst.join(MANIFEST_FILE_NAME));
        assert!(verify_manifest(&report.manifest_path, report.algorithm).unwrap());

        let manifest = fs::read_to_string(&report.manifest_path).expect("Failed to read manifest");
        let lines: Vec<_> = manifest.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("a.zip sha3-256 "));
        assert!(lines[1].starts_with("b.zip sha3-256 "));
        assert_eq!(lines[2], report.final_digest);
    }

    #[test]
    fn test_two_runs_over_identical_trees_agree_byte_for_byte() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut outputs = Vec::new();
        for n in 0..2 {
            let src = temp_dir.path().join(format!("src{}", n));
            let dst = temp_dir.path().join(format!("dst{}", n));
            write_file(&src.join("docs").join("readme.md"), b"stable contents");
            write_file(&src.join("docs").join("data.csv"), b"1,2,3\n");

            // Dropped at the end of each iteration, so re-acquiring is fine.
            let lock = acquire_lock(temp_dir.path());
            let report = execute(&lock, &config(src, dst.clone()), &ScriptedPrompter::silent())
                .expect("run should succeed");
            outputs.push((
                fs::read(dst.join("docs.zip")).expect("Failed to read archive"),
                fs::read_to_string(&report.manifest_path).expect("Failed to read manifest"),
            ));
        }

        assert_eq!(outputs[0].0, outputs[1].0, "archive bytes must match");
        assert_eq!(outputs[0].1, outputs[1].1, "manifests must match");
    }

    #[test]
    fn test_filtered_empty_directories_are_skipped() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        // `a` has one allowed and one excluded file; `b` is empty.
        write_file(&src.join("a").join("keep.txt"), b"keep");
        write_file(&src.join("a").join("trace.log"), b"drop");
        fs::create_dir_all(src.join("b")).expect("Failed to create dir");

        let mut cfg = config(src, dst.clone());
        cfg.filter_zip = true;
        cfg.skip_empty = true;

        let lock = acquire_lock(temp_dir.path());
        let report = execute(&lock, &cfg, &ScriptedPrompter::silent()).expect("run should succeed");

        assert_eq!(report.archived_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(dst.join("a.zip").exists());
        assert!(!dst.join("b.zip").exists());

        // Archive holds only the allowed file.
        let file = fs::File::open(dst.join("a.zip")).expect("Failed to open archive");
        let archive = zip::ZipArchive::new(file).expect("Failed to parse archive");
        let names: Vec<_> = archive.file_names().collect();
        assert_eq!(names, vec!["keep.txt"]);

        // Manifest lists the one archive plus the seal, nothing else.
        let manifest = fs::read_to_string(&report.manifest_path).expect("Failed to read manifest");
        let lines: Vec<_> = manifest.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("a.zip "));
    }

    #[test]
    fn test_declined_move_aborts_with_source_intact() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        write_file(&src.join("a").join("precious.txt"), b"do not lose");

        let mut cfg = config(src.clone(), dst.clone());
        cfg.move_source = true;

        let lock = acquire_lock(temp_dir.path());
        let prompter = ScriptedPrompter {
            confirm: false,
            sub: None,
        };
        let err = execute(&lock, &cfg, &prompter).unwrap_err();

        assert!(err.is_user_abort());
        // Archiving had already happened, but the source is untouched and
        // nothing from it was transported into the destination.
        assert_eq!(
            fs::read_to_string(src.join("a").join("precious.txt")).unwrap(),
            "do not lose"
        );
        assert!(dst.join("a.zip").exists());
        assert!(!dst.join("a").exists());
    }

    #[test]
    fn test_confirmed_move_transports_and_clears_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        write_file(&src.join("a").join("one.txt"), b"one");
        write_file(&src.join("a").join("two.txt"), b"two");

        let mut cfg = config(src.clone(), dst.clone());
        cfg.move_source = true;

        let lock = acquire_lock(temp_dir.path());
        let prompter = ScriptedPrompter {
            confirm: true,
            sub: None,
        };
        let report = execute(&lock, &cfg, &prompter).expect("run should succeed");

        assert_eq!(report.moved_files, 2);
        assert!(dst.join("a").join("one.txt").exists());
        assert!(dst.join("a").join("two.txt").exists());
        assert!(dst.join("a.zip").exists());
        // Everything qualified, so the source root is gone entirely.
        assert!(!src.exists());
    }

    #[test]
    fn test_unsafe_move_skips_the_prompt() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        write_file(&src.join("a").join("one.txt"), b"one");

        let mut cfg = config(src.clone(), dst);
        cfg.move_source = true;
        cfg.skip_confirmation = true;

        let lock = acquire_lock(temp_dir.path());
        // The prompter would decline, but the override never consults it.
        let report = execute(&lock, &cfg, &ScriptedPrompter::silent()).expect("run should succeed");

        assert_eq!(report.moved_files, 1);
        assert!(!src.exists());
    }

    #[test]
    fn test_filtered_move_leaves_excluded_files_behind() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        write_file(&src.join("a").join("doc.txt"), b"move");
        write_file(&src.join("a").join("tool.exe"), b"stay");

        let mut cfg = config(src.clone(), dst.clone());
        cfg.move_source = true;
        cfg.skip_confirmation = true;
        cfg.filter_move = true;

        let lock = acquire_lock(temp_dir.path());
        let report = execute(&lock, &cfg, &ScriptedPrompter::silent()).expect("run should succeed");

        assert_eq!(report.moved_files, 1);
        assert!(dst.join("a").join("doc.txt").exists());
        assert!(src.join("a").join("tool.exe").exists());
        assert!(!src.join("a").join("doc.txt").exists());
    }

    #[test]
    fn test_secondary_copy_receives_archives_then_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        let cpy = temp_dir.path().join("cpy");
        write_file(&src.join("a").join("one.txt"), b"one");

        let mut cfg = config(src, dst);
        cfg.secondary_copy = Some(cpy.clone());

        let lock = acquire_lock(temp_dir.path());
        let report = execute(&lock, &cfg, &ScriptedPrompter::silent()).expect("run should succeed");

        // a.zip + hashes.txt from the output directory, one.txt from the source.
        assert_eq!(report.copied_files, 3);
        assert!(cpy.join("a.zip").exists());
        assert!(cpy.join(MANIFEST_FILE_NAME).exists());
        assert!(cpy.join("a").join("one.txt").exists());
    }

    #[test]
    fn test_subdirectory_prompt_nests_all_output() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        let cpy = temp_dir.path().join("cpy");
        write_file(&src.join("a").join("one.txt"), b"one");

        let mut cfg = config(src, dst.clone());
        cfg.prompt_subdir = true;
        cfg.secondary_copy = Some(cpy.clone());

        let lock = acquire_lock(temp_dir.path());
        let prompter = ScriptedPrompter {
            confirm: false,
            sub: Some("batch42".to_string()),
        };
        let report = execute(&lock, &cfg, &prompter).expect("run should succeed");

        assert_eq!(report.output_dir, dst.join("batch42"));
        assert!(dst.join("batch42").join("a.zip").exists());
        assert!(dst.join("batch42").join(MANIFEST_FILE_NAME).exists());
        assert!(cpy.join("batch42").join("a.zip").exists());
    }

    #[test]
    fn test_unanswered_subdirectory_prompt_aborts() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        write_file(&src.join("a").join("one.txt"), b"one");

        let mut cfg = config(src, dst.clone());
        cfg.prompt_subdir = true;

        let lock = acquire_lock(temp_dir.path());
        let err = execute(&lock, &cfg, &ScriptedPrompter::silent()).unwrap_err();

        assert!(err.is_user_abort());
        assert!(!dst.join(MANIFEST_FILE_NAME).exists());
    }

    #[test]
    fn test_occupied_secondary_target_rejected_before_any_creation() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        write_file(&src.join("a").join("one.txt"), b"one");

        // A plain file occupies the secondary copy path.
        let occupied = temp_dir.path().join("occupied");
        write_file(&occupied, b"not a directory");

        let mut cfg = config(src, dst.clone());
        cfg.secondary_copy = Some(occupied);

        let lock = acquire_lock(temp_dir.path());
        let err = execute(&lock, &cfg, &ScriptedPrompter::silent()).unwrap_err();

        assert!(matches!(err, EngineError::DestinationInvalid { .. }));
        assert!(!dst.exists(), "destination must not be created");
    }

    #[test]
    fn test_missing_source_reported_before_any_side_effect() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("nonexistent");
        let dst = temp_dir.path().join("dst");

        let lock = acquire_lock(temp_dir.path());
        let err = execute(&lock, &config(src, dst.clone()), &ScriptedPrompter::silent()).unwrap_err();

        assert!(matches!(err, EngineError::SourceNotFound { .. }));
        assert!(!dst.exists(), "destination must not be created");
    }

    #[test]
    fn test_source_without_subdirectories_yields_sealed_empty_manifest() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(&src).expect("Failed to create dir");
        write_file(&src.join("loose.txt"), b"not in any subdirectory");

        let lock = acquire_lock(temp_dir.path());
        let report = execute(&lock, &config(src, dst), &ScriptedPrompter::silent())
            .expect("run should succeed");

        assert_eq!(report.archived_count(), 0);
        let manifest = fs::read_to_string(&report.manifest_path).expect("Failed to read manifest");
        assert_eq!(manifest, format!("{}\n", report.final_digest));
        assert!(verify_manifest(&report.manifest_path, report.algorithm).unwrap());
    }
}
