//! Error handling for the Rafko CLI.

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI-specific errors.
#[derive(Error, Debug)]
pub enum CliError {
    /// Propagated from the network data model
    #[error("network error: {0}")]
    Network(#[from] rafko_core::CoreError),

    /// Propagated from the training engine
    #[error("training error: {0}")]
    Gym(#[from] rafko_gym::GymError),

    /// Network or dataset description could not be parsed
    #[error("invalid network/dataset file: {0}")]
    Parse(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
