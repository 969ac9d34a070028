//! Error taxonomy of the planning pipeline.
//!
//! Every error is surfaced to the caller unmodified: no stage relaxes a
//! constraint or fabricates a partial schedule to recover from one.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Stage;

/// Errors returned by the stage entry points and the state file.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Structurally impossible inputs, detected before any engine call.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The engine proved that no assignment satisfies the hard constraints.
    #[error("{stage} stage infeasible (constraint family: {}; implicated stage: {implicated})", family.as_deref().unwrap_or("unknown"))]
    Infeasible {
        /// Stage that ran the engine.
        stage: Stage,
        /// Constraint family the engine flagged, when it surfaced one.
        family: Option<String>,
        /// Stage whose output is the likely cause.
        implicated: Stage,
    },

    /// The search budget expired before any solution was found.
    #[error("{stage} stage timed out after {elapsed_ms} ms without a solution; raise the time limit or relax the configuration")]
    Timeout {
        /// Stage that ran the engine.
        stage: Stage,
        /// Wall time spent (ms).
        elapsed_ms: u64,
    },

    /// A stage was invoked without a complete prior-stage schedule.
    #[error("{stage} stage precondition failed: {message}")]
    StagePrecondition {
        /// Stage that was invoked.
        stage: Stage,
        /// What is missing.
        message: String,
    },

    /// The state file could not be read or written.
    #[error("state file {}: {source}", path.display())]
    Io {
        /// State file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The state file is not a valid schedule.
    #[error("state file format: {0}")]
    Format(#[from] serde_json::Error),
}

impl PlanError {
    /// Short name of the error kind, for front ends.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::InvalidConfiguration(_) => "InvalidConfiguration",
            PlanError::Infeasible { .. } => "Infeasible",
            PlanError::Timeout { .. } => "Timeout",
            PlanError::StagePrecondition { .. } => "StagePrecondition",
            PlanError::Io { .. } => "Io",
            PlanError::Format(_) => "Format",
        }
    }
}
