use core::result::Result as CoreResult;
use core::time::Duration;
use std::io::Error as IoError;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for engine operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur in the scholar engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied parameter is out of range or malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The embedding model cannot be reached or loaded.
    #[error("embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The text generator cannot be reached or returned a transport failure.
    #[error("generator unavailable: {0}")]
    GeneratorUnavailable(String),

    /// Structured generator output did not parse into the expected shape.
    #[error("generator output malformed: {0}")]
    GenerationFormat(String),

    /// The document store collaborator failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// An operation exceeded its time budget.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// A workflow node failed; wraps the cause with the node name.
    #[error("node '{node}' failed: {source}")]
    Node {
        /// Name of the node that raised the failure.
        node: String,
        /// Underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Required API key was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

    /// Index snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Determines whether this error may succeed if retried.
    ///
    /// Returns `true` for transient collaborator failures. Embedding
    /// unavailability is deliberately not retryable: ingestion and query
    /// both treat it as a hard failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GeneratorUnavailable(_) | Self::Persistence(_))
    }

    /// Wraps this error with the name of the workflow node that raised it.
    #[must_use]
    pub fn at_node<T: Into<String>>(self, node: T) -> Self {
        Self::Node {
            node: node.into(),
            source: Box::new(self),
        }
    }

    /// Returns the originating node name if this is a node failure.
    pub fn node_name(&self) -> Option<&str> {
        match self {
            Self::Node { node, .. } => Some(node),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, from_str};
    use std::io;

    #[test]
    fn test_error_display() {
        let error1 = Error::InvalidParameter("overlap must be smaller than size".to_owned());
        assert_eq!(
            error1.to_string(),
            "invalid parameter: overlap must be smaller than size"
        );

        let error2 = Error::GenerationFormat("not a JSON array".to_owned());
        assert_eq!(
            error2.to_string(),
            "generator output malformed: not a JSON array"
        );

        let error3 = Error::MissingApiKey("OPENROUTER_API_KEY".to_owned());
        assert_eq!(error3.to_string(), "API key not found: OPENROUTER_API_KEY");
    }

    #[test]
    fn test_error_is_retryable() {
        // Retryable errors
        let error1 = Error::GeneratorUnavailable("rate limited".to_owned());
        assert!(error1.is_retryable());

        let error2 = Error::Persistence("connection reset".to_owned());
        assert!(error2.is_retryable());

        // Non-retryable errors
        let error3 = Error::EmbeddingUnavailable("model not pulled".to_owned());
        assert!(!error3.is_retryable());

        let error4 = Error::InvalidParameter("k must be positive".to_owned());
        assert!(!error4.is_retryable());
    }

    #[test]
    fn test_node_wrapping() {
        let error = Error::GenerationFormat("missing choices".to_owned()).at_node("generate_mcqs");
        assert_eq!(error.node_name(), Some("generate_mcqs"));
        assert_eq!(
            error.to_string(),
            "node 'generate_mcqs' failed: generator output malformed: missing choices"
        );

        let plain = Error::Other("no node".to_owned());
        assert!(plain.node_name().is_none());
    }

    #[test]
    fn test_error_from_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = from_str::<JsonValue>("invalid json").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
