//! Error handling for the voting core

use crate::types::Position;

/// Result type alias for the voting core
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the voting core
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Empty or malformed input
    #[error("Invalid input: {field}")]
    InvalidInput { field: String },

    /// Voter code is unknown or already used.
    ///
    /// The two cases are deliberately collapsed so callers cannot probe
    /// which codes exist.
    #[error("Voter code not found or already used")]
    CodeRejected,

    /// Vote submitted without a voter code
    #[error("Voter code is missing")]
    MissingVoterCode,

    /// Vote write did not reach durable storage; safe to retry
    #[error("Vote submission failed: {reason}")]
    SubmissionFailed { reason: String },

    /// Voter already has a recorded vote for this position
    #[error("Voter {voter_code} has already voted for {position}")]
    DuplicateVote {
        voter_code: String,
        position: Position,
    },

    /// Candidate does not exist or runs for another position
    #[error("Candidate {candidate_id} is not running for {position}")]
    InvalidCandidate {
        candidate_id: String,
        position: Position,
    },

    /// Admin capability required
    #[error("Unauthorized")]
    Unauthorized,

    /// Raw storage failure
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new invalid input error
    pub fn invalid_input(field: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
        }
    }

    /// Create a new submission failure
    pub fn submission_failed(reason: impl Into<String>) -> Self {
        Self::SubmissionFailed {
            reason: reason.into(),
        }
    }

    /// Create a new backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the failed operation can be retried unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SubmissionFailed { .. } | Self::Backend { .. })
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! store_error {
    ($msg:expr) => {
        $crate::Error::backend($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::backend(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::Error::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::config(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let input_err = Error::invalid_input("code");
        assert!(matches!(input_err, Error::InvalidInput { .. }));

        let submit_err = Error::submission_failed("connection reset");
        assert!(matches!(submit_err, Error::SubmissionFailed { .. }));

        let backend_err = Error::backend("timeout");
        assert!(matches!(backend_err, Error::Backend { .. }));
    }

    #[test]
    fn test_error_macros() {
        let store_err = store_error!("table {} unavailable", "votes");
        assert!(matches!(store_err, Error::Backend { ref message } if message == "table votes unavailable"));

        let config_err = config_error!("bad value");
        assert!(matches!(config_err, Error::Config { .. }));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::submission_failed("x").is_retryable());
        assert!(Error::backend("x").is_retryable());
        assert!(!Error::CodeRejected.is_retryable());
        assert!(
            !Error::DuplicateVote {
                voter_code: "PPGT-001".to_string(),
                position: Position::Ketua,
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_code_rejected_message_is_uniform() {
        // Same text whether the code was unknown or spent
        assert_eq!(
            Error::CodeRejected.to_string(),
            "Voter code not found or already used"
        );
    }
}
