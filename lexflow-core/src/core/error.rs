//! Unified error handling for the lexflow engine.
//!
//! A single error enum covers every failure class a pipeline run can
//! surface: bad input, an invalid dependency graph, a failing stage body,
//! worker-thread trouble, and configuration or I/O problems.

use thiserror::Error;

/// Main error type for the lexflow engine.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input batch cannot be processed (empty, or all documents empty).
    #[error("invalid input: {message}")]
    InputInvalid {
        /// Description of what is wrong with the input.
        message: String,
    },

    /// The dependency graph is not runnable (cycle, unknown stage id,
    /// duplicate stage or edge).
    #[error("invalid dependency graph: {message}")]
    GraphInvalid {
        /// Description of the graph defect.
        message: String,
    },

    /// A stage body returned an error during execution.
    #[error("stage '{stage}' failed: {message}")]
    StageFailure {
        /// Id of the stage whose body failed.
        stage: String,
        /// Error reported by the stage body.
        message: String,
    },

    /// A worker thread could not be spawned or did not terminate cleanly.
    #[error("worker error: {message}")]
    Worker {
        /// Description of the worker failure.
        message: String,
    },

    /// Configuration is unusable beyond what defaults can repair.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// A vocabulary file is malformed or conflicts with reserved token ids.
    #[error("vocabulary error: {message}")]
    Vocabulary {
        /// Description of the vocabulary problem.
        message: String,
    },

    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error from the ingestion layer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error from the configuration loader.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PipelineError {
    /// Short category label for logging and report lines.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InputInvalid { .. } => "input",
            PipelineError::GraphInvalid { .. } => "graph",
            PipelineError::StageFailure { .. } => "stage",
            PipelineError::Worker { .. } => "worker",
            PipelineError::Config { .. } => "config",
            PipelineError::Vocabulary { .. } => "vocabulary",
            PipelineError::Io(_) => "io",
            PipelineError::Csv(_) => "csv",
            PipelineError::Toml(_) => "toml",
        }
    }
}

/// Convenient Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
