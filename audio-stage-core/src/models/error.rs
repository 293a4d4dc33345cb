use thiserror::Error;

/// Errors that can occur during staging operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("buffer not initialized")]
    NotInitialized,

    #[error("destination too small: need {needed}, have {available}")]
    DestinationTooSmall { needed: usize, available: usize },

    #[error("sample source failed: {0}")]
    SourceFailed(String),
}
