//! Error types for Keystead

use thiserror::Error;

/// Result type alias using KeysteadError
pub type Result<T> = std::result::Result<T, KeysteadError>;

/// Main error type for Keystead core operations
#[derive(Debug, Error)]
pub enum KeysteadError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

impl KeysteadError {
    /// Whether this error comes from configuration (as opposed to IO)
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message() {
        let err: KeysteadError = ConfigError::InvalidValue {
            field: "variants.release.store_file".to_string(),
            message: "at least one source is required".to_string(),
        }
        .into();

        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: variants.release.store_file - at least one source is required"
        );
    }
}
