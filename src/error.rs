//! Centralized error types for mailshell.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailshell library.
#[derive(Error, Debug)]
pub enum MailError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An attachment, inline image or remote URL could not be resolved.
    #[error("Could not resolve '{0}'")]
    Resolution(String),

    /// The mailbox backend failed or could not be reached.
    #[error("Mailbox error: {0}")]
    Mailbox(String),

    /// A message could not be parsed.
    #[error("MIME decoding error: {0}")]
    Mime(String),

    /// An outgoing message could not be assembled.
    #[error("Could not build message: {0}")]
    Compose(String),

    /// The configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard input was closed while a prompt was waiting.
    #[error("Input closed")]
    InputClosed,
}

/// Convenience alias for `Result<T, MailError>`.
pub type Result<T> = std::result::Result<T, MailError>;

impl MailError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (prefer `MailError::io`).
impl From<std::io::Error> for MailError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
