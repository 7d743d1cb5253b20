use thiserror::Error;

use crate::coordination::CoordinationOp;

/// Failures surfaced while activating or reconfiguring jobs.
#[derive(Debug, Error)]
pub enum ActivationError {
    /// The job object implements none of the recognised variants.
    #[error("job `{job}` ({implementation}) implements no supported job variant")]
    UnsupportedJobVariant {
        job: String,
        implementation: &'static str,
    },

    /// A requested job is not registered; nothing was changed.
    #[error("unknown job name(s): {}", names.join(", "))]
    UnknownJobName { names: Vec<String> },

    /// The coordination service rejected or did not answer a call.
    #[error("coordination {operation} of job `{job}` failed: {source}")]
    CoordinationUnavailable {
        job: String,
        operation: CoordinationOp,
        #[source]
        source: anyhow::Error,
    },

    /// The external scheduler could not be initialised for a job.
    #[error("scheduler failed to initialize job `{job}`: {source}")]
    SchedulerInit {
        job: String,
        #[source]
        source: anyhow::Error,
    },

    /// Several jobs failed to activate while the rest of the change applied.
    #[error("{} job(s) failed to activate", failures.len())]
    PartiallyApplied { failures: Vec<ActivationError> },
}

impl ActivationError {
    /// The job this error is about, when it concerns a single job.
    pub fn job(&self) -> Option<&str> {
        match self {
            ActivationError::UnsupportedJobVariant { job, .. }
            | ActivationError::CoordinationUnavailable { job, .. }
            | ActivationError::SchedulerInit { job, .. } => Some(job),
            ActivationError::UnknownJobName { .. } => None,
            ActivationError::PartiallyApplied { .. } => None,
        }
    }

    /// Whether retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ActivationError::CoordinationUnavailable { .. } => true,
            ActivationError::SchedulerInit { .. } => true,
            ActivationError::PartiallyApplied { failures } => {
                failures.iter().any(Self::is_retryable)
            }
            ActivationError::UnsupportedJobVariant { .. } => false,
            ActivationError::UnknownJobName { .. } => false,
        }
    }
}

/// Failures loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
