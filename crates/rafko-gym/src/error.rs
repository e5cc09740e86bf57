//! Error types for the training engine.

use thiserror::Error;

/// Result type for training-engine operations.
pub type Result<T> = std::result::Result<T, GymError>;

/// Errors that can occur while building the operation graph or running a
/// training iteration.
#[derive(Error, Debug)]
pub enum GymError {
    /// Propagated from the network data model
    #[error("network error: {source}")]
    Network {
        /// Underlying core error
        #[from]
        source: rafko_core::CoreError,
    },

    /// Dataset/sequence dimensions are inconsistent with the network
    #[error("invalid dataset: {reason}")]
    InvalidDataset {
        /// Reason for the mismatch
        reason: String,
    },

    /// An operation graph could not be built (cyclic dependency, missing
    /// output, etc.)
    #[error("graph build error: {reason}")]
    GraphBuild {
        /// Reason for the failure
        reason: String,
    },

    /// NaN or infinity observed during a forward or backward sweep.
    #[error("numerical failure at operation {operation_index} during step {step}")]
    NumericalFailure {
        /// Operation whose value or derivative was non-finite
        operation_index: usize,
        /// Sequence step at which the failure was observed
        step: usize,
    },

    /// An operation was attempted while backprop storage had not been
    /// reset, or while a concurrent evaluation was in progress.
    #[error("invalid state transition: {reason}")]
    InvalidStateTransition {
        /// Reason for the rejected transition
        reason: String,
    },
}

impl GymError {
    /// Create an invalid-dataset error.
    pub fn invalid_dataset(reason: impl Into<String>) -> Self {
        Self::InvalidDataset {
            reason: reason.into(),
        }
    }

    /// Create a graph-build error.
    pub fn graph_build(reason: impl Into<String>) -> Self {
        Self::GraphBuild {
            reason: reason.into(),
        }
    }

    /// Create a numerical-failure error.
    pub fn numerical_failure(operation_index: usize, step: usize) -> Self {
        Self::NumericalFailure {
            operation_index,
            step,
        }
    }

    /// Create an invalid-state-transition error.
    pub fn invalid_state_transition(reason: impl Into<String>) -> Self {
        Self::InvalidStateTransition {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GymError::numerical_failure(3, 7);
        let msg = format!("{}", err);
        assert!(msg.contains("operation 3"));
        assert!(msg.contains("step 7"));
    }
}
