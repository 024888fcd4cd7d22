//! Keystead Core - Core library for signing credential tooling
//!
//! This crate provides the error taxonomy and the configuration file
//! (`keystead.toml` / `keystead.yaml`) shared by the signing resolver,
//! the Gradle linter and the CLI.

pub mod config;
pub mod error;

pub use config::{
    CredentialField, CredentialSource, Config, LintConfig, LintSeverity, ResolutionConfig,
    VariantConfig,
};
pub use error::{ConfigError, KeysteadError, Result};
