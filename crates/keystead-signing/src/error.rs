//! Error types for signing credential operations

use std::path::PathBuf;
use thiserror::Error;

use crate::descriptor::MissingField;
use crate::properties::PropertiesSyntaxError;

/// Result type alias for signing operations
pub type Result<T> = std::result::Result<T, SigningError>;

/// Signing-related errors
#[derive(Debug, Error)]
pub enum SigningError {
    /// Required attributes did not resolve from any source
    #[error("Missing signing credentials for variant '{variant}': {}", format_missing(.missing))]
    MissingCredentials {
        variant: String,
        missing: Vec<MissingField>,
    },

    /// An environment variable name that looks like a literal value
    #[error("'{name}' configured for the {field} is not an environment variable name; it looks like a literal value")]
    SuspiciousEnvName { field: String, name: String },

    /// Variant not present in configuration
    #[error("Unknown build variant '{0}'")]
    UnknownVariant(String),

    /// Keystore path does not exist
    #[error("Keystore not found: {0}")]
    KeystoreNotFound(PathBuf),

    /// Keystore path is not a regular file
    #[error("Keystore path is not a file: {0}")]
    KeystoreNotAFile(PathBuf),

    /// Keystore file cannot be a keystore
    #[error("Invalid keystore {path}: {reason}")]
    InvalidKeystore { path: PathBuf, reason: String },

    /// Keystore rejected the store password
    #[error("Keystore password was rejected for {0}")]
    IncorrectPassword(PathBuf),

    /// Alias not present in keystore
    #[error("Key alias '{alias}' not found in {keystore} (available: {})", .available.join(", "))]
    AliasNotFound {
        alias: String,
        keystore: PathBuf,
        available: Vec<String>,
    },

    /// Malformed properties file
    #[error("Failed to parse {path}: {source}")]
    Properties {
        path: PathBuf,
        #[source]
        source: PropertiesSyntaxError,
    },

    /// Tool not found
    #[error("Tool not found: {tool}. {hint}")]
    ToolNotFound { tool: String, hint: String },

    /// Tool execution failed
    #[error("Tool failed: {tool} - {reason}")]
    ToolFailed { tool: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_missing(missing: &[MissingField]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
