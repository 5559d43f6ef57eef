//! Operator decision points.
//!
//! This module defines the Prompter trait, which decouples the engine from
//! any specific terminal technology. Implementations own all interaction;
//! the engine only sees the decision. A read failure or closed input stream
//! must come back as a negative answer, never as a hang.

use std::path::Path;

use tracing::info;

use crate::error::EngineError;

/// Trait for answering the pipeline's interactive questions.
pub trait Prompter: Send {
    /// Ask whether the move phase may relocate the source tree.
    ///
    /// Asked before anything is copied or deleted; `source` and
    /// `destination` are shown so the operator knows exactly what would
    /// move where.
    fn confirm_move(&self, source: &Path, destination: &Path) -> bool;

    /// Ask for the name of the output subdirectory.
    ///
    /// Returning `None` (or an empty name) aborts the run.
    fn subdirectory_name(&self) -> Option<String>;
}

/// Gate in front of the move phase.
///
/// With `unsafe_override` set the gate opens without interaction; otherwise
/// the prompter decides. A declined gate is `UserAborted`, and the caller
/// must not have mutated the source before asking.
pub fn authorize_move(
    prompter: &dyn Prompter,
    unsafe_override: bool,
    source: &Path,
    destination: &Path,
) -> Result<(), EngineError> {
    if unsafe_override {
        info!("move confirmation skipped (unsafe override)");
        return Ok(());
    }
    if prompter.confirm_move(source, destination) {
        Ok(())
    } else {
        Err(EngineError::UserAborted)
    }
}
