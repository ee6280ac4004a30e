//! Error types for console log acquisition.

use std::path::PathBuf;

/// Errors raised while setting up or running the log tail.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// The directory that should contain the console log does not exist.
    #[error("log directory does not exist: {0}")]
    MissingLogDirectory(PathBuf),

    /// An I/O failure outside the tail's retry loop.
    #[error("console log I/O error: {0}")]
    Io(#[from] std::io::Error),
}
