//! ZipHash - Command-line interface for the archiving engine.
//!
//! Parses arguments, wires terminal prompts into the engine's Prompter
//! seam, and prints a run summary. Log output goes to stderr and to an
//! append-only log file; the sealed manifest digest is the only line
//! written to stdout.

use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dialoguer::{Confirm, Input};
use tracing::debug;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use engine::{
    execute, EngineError, HashAlgorithm, InstanceLock, Prompter, RunConfig, RunReport,
    ALGORITHM_NAMES,
};

const LOG_FILE_NAME: &str = "ziphash.log";

/// ZipHash - Archive, hash, and seal each subdirectory of a source tree
#[derive(Parser, Debug)]
#[command(name = "ziphash")]
#[command(version = "0.1.0")]
#[command(about = "Zip each subdirectory of SRC into DST, hash the archives, and seal a manifest")]
struct Args {
    /// Source directory whose immediate subdirectories are archived
    #[arg(value_name = "SRC")]
    src: PathBuf,

    /// Destination directory for the archives and the manifest
    #[arg(value_name = "DST")]
    dst: PathBuf,

    /// Ask for a subdirectory name and nest all output under it
    #[arg(long)]
    sub: bool,

    /// Digest algorithm: md5, sha256, sha512, sha3-256, or blake3
    #[arg(long, value_name = "ALGORITHM", default_value = "sha3-256")]
    hash: String,

    /// Move the source into the destination after archiving (asks first)
    #[arg(long)]
    mv: bool,

    /// Also copy the archives and the source tree into this directory
    #[arg(long, value_name = "PATH")]
    cpy: Option<PathBuf>,

    /// Archive only files from the known-extension catalogue
    #[arg(long)]
    fzip: bool,

    /// Apply the extension catalogue to the secondary source copy
    #[arg(long)]
    fcpy: bool,

    /// Apply the extension catalogue to the move
    #[arg(long)]
    fmv: bool,

    /// Skip subdirectories with no eligible files instead of writing empty archives
    #[arg(long)]
    fmpt: bool,

    /// Skip the move confirmation prompt
    #[arg(long = "unsafe")]
    unsafe_override: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

/// Terminal implementation of the engine's prompt seam.
///
/// Unanswerable prompts (closed stdin, detached terminal) read as a
/// declined confirmation or an empty name, never as consent.
struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn confirm_move(&self, source: &Path, destination: &Path) -> bool {
        Confirm::new()
            .with_prompt(format!(
                "Move {} into {}? Transported files are removed from the source",
                source.display(),
                destination.display()
            ))
            .default(false)
            .interact()
            .unwrap_or(false)
    }

    fn subdirectory_name(&self) -> Option<String> {
        let entered: String = Input::new()
            .with_prompt("Subdirectory name for this run")
            .allow_empty(true)
            .interact_text()
            .ok()?;
        let trimmed = entered.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Send log lines to stderr and append them to the log file.
///
/// Console verbosity follows --debug (or RUST_LOG when set); the file
/// layer sees the same events without ANSI colors.
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let timer = ChronoLocal::new("%Y/%m/%d-%H:%M:%S".to_string());

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(timer.clone())
        .with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(filter).with(console);

    // A read-only working directory costs the log file, not the run.
    match OpenOptions::new().create(true).append(true).open(LOG_FILE_NAME) {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(Arc::new(file));
            registry.with(file_layer).init();
        }
        Err(_) => registry.init(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

fn print_summary(report: &RunReport) {
    eprintln!();
    eprintln!("Run complete!");
    eprintln!(
        "Summary: {} archived, {} skipped",
        report.archived_count(),
        report.skipped_count()
    );
    eprintln!("Archive bytes: {}", format_bytes(report.archive_bytes()));
    if report.copied_files > 0 {
        eprintln!("Copied: {} files", report.copied_files);
    }
    if report.moved_files > 0 {
        eprintln!("Moved: {} files", report.moved_files);
    }
    eprintln!("Manifest: {}", report.manifest_path.display());
    eprintln!("Elapsed: {}", format_duration(report.duration()));

    // Final digest on stdout so scripts can capture it alone.
    println!("{}", report.final_digest);
}

/// Parse and validate command-line arguments, then run the pipeline
fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    let exit_code = match run_cli(&args, &DialoguerPrompter, &InstanceLock::default_path()) {
        Ok(report) => {
            print_summary(&report);
            0
        }
        Err(err) if err.is_user_abort() => {
            eprintln!("{}", err);
            3
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(
    args: &Args,
    prompter: &dyn Prompter,
    lock_path: &Path,
) -> Result<RunReport, EngineError> {
    debug!("parsed arguments: {:?}", args);

    // Resolve the algorithm before claiming the lock; a typo in --hash
    // should not leave a marker behind even briefly.
    let algorithm = match HashAlgorithm::from_name(&args.hash) {
        Ok(algorithm) => algorithm,
        Err(e) => {
            eprintln!("Known algorithms: {}", ALGORITHM_NAMES.join(", "));
            return Err(e);
        }
    };

    let lock = InstanceLock::acquire_at(lock_path)?;

    let config = RunConfig {
        source: args.src.clone(),
        destination: args.dst.clone(),
        secondary_copy: args.cpy.clone(),
        algorithm,
        filter_zip: args.fzip,
        filter_copy: args.fcpy,
        filter_move: args.fmv,
        skip_empty: args.fmpt,
        move_source: args.mv,
        prompt_subdir: args.sub,
        skip_confirmation: args.unsafe_override,
        debug: args.debug,
    };

    execute(&lock, &config, prompter)
}
