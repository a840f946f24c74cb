//! Error taxonomy shared by every gitshelf crate.

/// Errors produced while loading, merging, or persisting a collection.
#[derive(Debug, thiserror::Error)]
pub enum ShelfError {
    /// A file or reference does not exist in the backend.
    #[error("Not found: {what}")]
    NotFound {
        /// Description of the missing item (`reference:path`, branch name, ...).
        what: String,
    },

    /// The configured file path does not use the one supported format.
    #[error("{path} is not a valid file type")]
    UnsupportedFormat {
        /// Offending file path.
        path: String,
    },

    /// The operation needs an identity field the collection doesn't have.
    #[error("File {path} doesn't contain elements")]
    UnsupportedOperation {
        /// File path of the collection.
        path: String,
    },

    /// Lower-level git, HTTP, or authentication failure.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The file exists but is not valid YAML.
    #[error("Failed to decode {path}: {source}")]
    Decode {
        /// File path being decoded.
        path: String,
        /// Underlying parser error.
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The value could not be serialized at all.
    #[error("Failed to encode {path}: {source}")]
    Encode {
        /// File path being encoded.
        path: String,
        /// Underlying serializer error.
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The decoded value doesn't have the structural shape the caller needs.
    #[error("Malformed {path}: expected {expected}")]
    Malformed {
        /// File path of the collection.
        path: String,
        /// Shape that was expected.
        expected: &'static str,
    },

    /// Invalid session configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ShelfError {
    /// Shorthand for [`ShelfError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Shorthand for [`ShelfError::Backend`].
    pub fn backend(message: impl std::fmt::Display) -> Self {
        Self::Backend(message.to_string())
    }

    /// Whether this error reports a missing file or reference.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, ShelfError>;
