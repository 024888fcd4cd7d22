//! Configuration validation

use tracing::{debug, warn};

use crate::error::{ConfigError, Result};

use super::types::{Config, CredentialField, CredentialSource};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_properties_file(config)?;
    validate_variants(config)?;
    validate_lint(config)?;
    debug!("configuration validation passed");
    Ok(())
}

/// Whether a string is usable as an environment variable name
pub fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_properties_file(config: &Config) -> Result<()> {
    if config.properties_file.as_os_str().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "properties_file".to_string(),
            message: "path cannot be empty".to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_variants(config: &Config) -> Result<()> {
    if config.variants.is_empty() {
        return Err(ConfigError::MissingField("variants".to_string()).into());
    }

    for (name, variant) in &config.variants {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "variants".to_string(),
                message: "variant name cannot be empty".to_string(),
            }
            .into());
        }

        for field in CredentialField::ALL {
            let path = format!("variants.{}.{}", name, field.config_key());
            let source = variant.source(field);

            if variant.required && source.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: path,
                    message: "required variant needs at least one of env, property or literal"
                        .to_string(),
                }
                .into());
            }

            validate_source(&path, field, source)?;
        }
    }

    Ok(())
}

fn validate_source(path: &str, field: CredentialField, source: &CredentialSource) -> Result<()> {
    if let Some(env) = &source.env {
        if env.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.env", path),
                message: "environment variable name cannot be empty".to_string(),
            }
            .into());
        }
        if !is_valid_env_name(env) {
            // Refused or allowed at resolution time depending on strict_env_names
            warn!(field = %path, "env entry does not look like an environment variable name");
        }
    }

    if let Some(key) = &source.property {
        if key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.property", path),
                message: "properties key cannot be empty".to_string(),
            }
            .into());
        }
    }

    if field.is_secret() && source.literal.is_some() {
        warn!(field = %path, "literal password in configuration file");
    }

    Ok(())
}

fn validate_lint(config: &Config) -> Result<()> {
    for rule in config.lint.disabled.iter().chain(config.lint.severity.keys()) {
        if rule.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "lint".to_string(),
                message: "rule id cannot be empty".to_string(),
            }
            .into());
        }
    }
    Ok(())
}
