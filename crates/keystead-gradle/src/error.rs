//! Error types for Gradle script reading

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Gradle operations
pub type Result<T> = std::result::Result<T, GradleError>;

/// Gradle script errors
#[derive(Error, Debug)]
pub enum GradleError {
    /// Braces do not balance
    #[error("Unbalanced braces at line {line}: {message}")]
    Unbalanced { line: usize, message: String },

    /// A string literal is never closed
    #[error("Unterminated string starting at line {line}")]
    UnterminatedString { line: usize },

    /// Not a Gradle build script
    #[error("Not a Gradle build script: {0}")]
    NotAScript(PathBuf),

    /// Unknown lint rule in configuration
    #[error("Unknown lint rule '{0}'")]
    UnknownRule(String),

    /// Failed to read a script
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
