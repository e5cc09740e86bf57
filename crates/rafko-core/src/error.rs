//! Error types for the network data model

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while constructing or addressing a network
#[derive(Error, Debug)]
pub enum CoreError {
    /// Network dimensions are inconsistent (e.g. weight table too small)
    #[error("invalid network configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// A synapse encodes an index outside the valid range for its kind
    #[error("invalid synapse encoding: {reason}")]
    InvalidSynapse {
        /// Reason for invalid encoding
        reason: String,
    },

    /// An index (operation, weight, neuron, sample, ...) was out of range
    #[error("index {index} out of bounds for {kind} (len {len})")]
    IndexOutOfBounds {
        /// Kind of index (weight, neuron, operation, ...)
        kind: String,
        /// Offending index
        index: usize,
        /// Valid length
        len: usize,
    },

    /// A parameter failed validation
    #[error("invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },
}

impl CoreError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create an invalid synapse error
    pub fn invalid_synapse(reason: impl Into<String>) -> Self {
        Self::InvalidSynapse {
            reason: reason.into(),
        }
    }

    /// Create an out-of-bounds index error
    pub fn index_out_of_bounds(kind: impl Into<String>, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            kind: kind.into(),
            index,
            len,
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CoreError::invalid_config("zero neurons");
        assert!(matches!(err, CoreError::InvalidConfiguration { .. }));

        let err = CoreError::index_out_of_bounds("weight", 10, 5);
        assert!(matches!(err, CoreError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::index_out_of_bounds("neuron", 3, 2);
        let msg = format!("{}", err);
        assert!(msg.contains("index 3 out of bounds"));
    }
}
