//! Error types for docshift.
//!
//! Every store operation returns [`Result`]. Callers can tell a missing
//! document apart from a failed request and from a store-side rejection.

use thiserror::Error;

/// Result type alias for docshift operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the store or running a migration.
#[derive(Error, Debug)]
pub enum Error {
    /// The store answered 404 for the addressed resource.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request never produced a response (connect, I/O, body read).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("Store returned {status} for {context}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// What was being attempted.
        context: String,
        /// Raw response body.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode {context}: {source}")]
    Decode {
        /// What was being decoded.
        context: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A successful response lacked a field the caller depends on.
    #[error("Response is missing field '{0}'")]
    MissingField(&'static str),

    /// A document transform failed.
    #[error("Transform failed for document '{id}': {reason}")]
    Transform {
        /// Identifier of the document being transformed.
        id: String,
        /// Failure description.
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Builds a transform error for the given document.
    pub fn transform(id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Transform {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for a 404 from the store.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = Error::Status {
            status: 500,
            context: "bulk write".to_string(),
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Store returned 500 for bulk write: boom");
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("docs/doc/1".to_string()).is_not_found());
        assert!(!Error::MissingField("_id").is_not_found());
    }

    #[test]
    fn test_transform_error() {
        let err = Error::transform("a", "bad payload");
        assert!(matches!(err, Error::Transform { ref id, .. } if id == "a"));
    }
}
