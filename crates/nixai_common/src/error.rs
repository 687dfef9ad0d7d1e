//! Error types for the validation core.

use thiserror::Error;

/// Failure of an external collaborator call.
///
/// None of these abort a validation run. The owning step degrades its
/// score (or is omitted) and the pipeline continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    /// Binary missing, network unreachable, collaborator not configured
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Collaborator timed out during {operation} after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// Output could not be parsed; the check is treated as unverified
    #[error("Malformed collaborator response: {0}")]
    Malformed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CollaboratorError {
    /// Stable identifier used in logs and issue records
    pub fn code(&self) -> &'static str {
        match self {
            CollaboratorError::Unavailable(_) => "collaborator_unavailable",
            CollaboratorError::Timeout { .. } => "collaborator_timeout",
            CollaboratorError::Malformed(_) => "malformed_collaborator_response",
            CollaboratorError::InvalidInput(_) => "invalid_input",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CollaboratorError::Timeout { .. })
    }
}

impl From<std::io::Error> for CollaboratorError {
    fn from(err: std::io::Error) -> Self {
        CollaboratorError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(err: serde_json::Error) -> Self {
        CollaboratorError::Malformed(err.to_string())
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CollaboratorError::Timeout {
                operation: "http request".to_string(),
                after_ms: 0,
            }
        } else if err.is_decode() {
            CollaboratorError::Malformed(err.to_string())
        } else {
            CollaboratorError::Unavailable(err.to_string())
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            CollaboratorError::Unavailable("nix".into()).code(),
            "collaborator_unavailable"
        );
        let timeout = CollaboratorError::Timeout {
            operation: "check_package".into(),
            after_ms: 100,
        };
        assert_eq!(timeout.code(), "collaborator_timeout");
        assert!(timeout.is_timeout());
        assert_eq!(
            CollaboratorError::Malformed("x".into()).code(),
            "malformed_collaborator_response"
        );
    }

    #[test]
    fn test_io_not_found_maps_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such binary");
        let err: CollaboratorError = io.into();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }
}
