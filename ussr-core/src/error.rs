/*!
Error types for the USSR core engine.
*/

use thiserror::Error;

use crate::resource::LocationKind;

/// Result type used throughout the USSR core.
pub type Result<T> = std::result::Result<T, UssrError>;

/// Errors that can occur while transforming, saving or loading resources.
#[derive(Error, Debug)]
pub enum UssrError {
    /// The payload is not valid input for the transformer's source format
    #[error("Failed to decode {format} payload: {message}")]
    Decode { format: String, message: String },

    /// No transformer is registered under the requested key
    #[error("No transformer registered for content type: {0}")]
    UnregisteredTransformer(String),

    /// No handler can perform the operation for this location kind
    #[error("Cannot {operation} a resource at a {kind} location")]
    UnsupportedLocation {
        kind: LocationKind,
        operation: &'static str,
    },

    /// I/O errors raised by filesystem handlers
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network errors raised by the URL handler
    #[cfg(feature = "url")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Compression/decompression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl UssrError {
    /// Create a new decode error for the given source format
    pub fn decode<F: Into<String>, M: std::fmt::Display>(format: F, message: M) -> Self {
        Self::Decode {
            format: format.into(),
            message: message.to_string(),
        }
    }

    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unsupported_location(kind: LocationKind, operation: &'static str) -> Self {
        Self::UnsupportedLocation { kind, operation }
    }

    /// Whether the error came from a payload that did not match its format
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
