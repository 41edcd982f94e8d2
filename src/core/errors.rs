use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the command processor.
///
/// Failures of submitted work never propagate synchronously to the submitter;
/// they reach the monitor through `on_abort` and the future through `get()`.
/// The only errors returned directly from a submission call are the
/// admission errors (`QueueFull`, `ShutDown`).
#[derive(Error, Debug, Clone)]
pub enum CmdError {
    // Work outcome errors
    #[error("Work failed: {0}")]
    WorkFailed(Arc<anyhow::Error>),

    #[error("Work panicked: {message}")]
    Panicked { message: String },

    #[error("Work cancelled")]
    Cancelled,

    #[error("Step count mismatch: declared {declared} steps, task disagreed at step {step}")]
    StepCountMismatch { declared: usize, step: usize },

    // Admission errors
    #[error("Queue full: capacity {capacity} reached")]
    QueueFull { capacity: usize },

    #[error("Processor shut down")]
    ShutDown,
}

impl CmdError {
    /// Wrap an error returned by a unit of work
    pub fn work(err: anyhow::Error) -> Self {
        Self::WorkFailed(Arc::new(err))
    }

    /// Build a `Panicked` error from a caught unwind payload
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked { message }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether a fresh submission of the same work might succeed.
    ///
    /// The processor never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::WorkFailed(_) | Self::QueueFull { .. } => true,

            Self::Panicked { .. }
            | Self::Cancelled
            | Self::StepCountMismatch { .. }
            | Self::ShutDown => false,
        }
    }

    /// Get suggested delay before resubmitting
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            Self::QueueFull { .. } => Some(Duration::from_millis(100)),
            Self::WorkFailed(_) => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

/// Result type alias for CmdError
pub type Result<T> = std::result::Result<T, CmdError>;

/// Errors raised while loading or validating a `ProcessorConfig`
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration invalid: {0}")]
    Invalid(String),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while starting a processor
#[derive(Error, Debug)]
pub enum StartError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to spawn worker thread {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },
}
