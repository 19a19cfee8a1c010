//! Centralized error types for emldoc.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the emldoc library.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified input file does not exist.
    #[error("EML file not found: {0}")]
    FileNotFound(PathBuf),

    /// The message bytes could not be decoded into a parsed email.
    #[error("Failed to decode message: {0}")]
    Decode(String),

    /// A base64 payload delivered by the decoder is invalid.
    #[error("Invalid base64 payload in {context}: {source}")]
    Base64 {
        context: String,
        source: base64::DecodeError,
    },

    /// The header template is invalid or could not be filled.
    #[error("Header template error: {0}")]
    Template(String),

    /// The HTML tree could not be serialized.
    #[error("HTML processing error: {0}")]
    Html(String),

    /// The rendering collaborator failed.
    #[error("Render error: {0}")]
    Render(String),

    /// The configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, ConvertError>`.
pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Base64` variant describing where the payload came from.
    pub fn base64(context: impl Into<String>, source: base64::DecodeError) -> Self {
        Self::Base64 {
            context: context.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare; prefer `ConvertError::io`).
impl From<std::io::Error> for ConvertError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

impl From<handlebars::RenderError> for ConvertError {
    fn from(e: handlebars::RenderError) -> Self {
        Self::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for ConvertError {
    fn from(e: handlebars::TemplateError) -> Self {
        Self::Template(e.to_string())
    }
}
