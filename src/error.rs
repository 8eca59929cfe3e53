use thiserror::Error;

use crate::transition::GeneratorState;

/// Result type used by the recovery engine.
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Why no generator state could be recovered. There is no partial success:
/// every variant means no prediction is offered.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("no observations supplied")]
    NoObservations,

    #[error("observation {index} is not a generator output: {value}")]
    MalformedObservation { index: usize, value: f64 },

    #[error("no generator state explains these observations")]
    Unsatisfiable,

    #[error("solver did not answer within its budget after {attempts} attempt(s)")]
    SolverTimeout { attempts: u32 },

    #[error("solver error: {0}")]
    SolverError(String),

    #[error("observations admit more than one state (free bits: {free_bits:?}); candidate {candidate}")]
    AmbiguousModel { candidate: GeneratorState, free_bits: Option<u32> },
}

impl RecoveryError {
    /// Whether retrying with more time or different observations may help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecoveryError::SolverTimeout { .. } | RecoveryError::SolverError(_))
    }
}
