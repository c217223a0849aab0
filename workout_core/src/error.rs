//! Error types for the workout_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification callers map to user-facing failures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Storage,
    Config,
}

/// Core error type for workout_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Referenced plan, record or active session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied an unusable value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Session or plan store failure not covered by the variants above
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Config(_) | Error::Toml(_) => ErrorKind::Config,
            Error::Io(_) | Error::Json(_) | Error::Csv(_) | Error::Storage(_) => {
                ErrorKind::Storage
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::NotFound("plan 3".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::InvalidArgument("rest".into()).kind(),
            ErrorKind::InvalidArgument
        );
        let io = Error::from(io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(io.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_display_includes_message() {
        let err = Error::NotFound("no active workout session".into());
        assert_eq!(err.to_string(), "Not found: no active workout session");
    }
}
