use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Network error: {0}")] Network(String),

    #[error("Invalid response: {0}")] InvalidResponse(String),

    #[error("Unknown asset: {0}")] UnknownAsset(String),

    #[error("Invalid amount: {0:?}")] InvalidAmount(String),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Serialization error: {0}")] Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")] Io(#[from] std::io::Error),
}

impl TrackerError {
    /// Transient errors that the next refresh or conversion can clear on its own.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TrackerError::Network(_) => true,
            TrackerError::InvalidResponse(_) => true,
            TrackerError::UnknownAsset(_) => true,
            _ => false,
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
