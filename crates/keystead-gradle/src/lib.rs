//! Keystead Gradle - build script reader and signing lint
//!
//! Reads `build.gradle.kts` and `build.gradle` files into a [`BuildScript`]
//! describing the Android build configuration and, for every signing config,
//! where each credential comes from. The [`lint`] module checks that model for
//! the mistakes that make release signing fail late or leak secrets.

pub mod discovery;
pub mod error;
pub mod expr;
pub mod lint;
pub mod model;
mod parser;
mod script;

#[cfg(test)]
mod fixtures;

pub use discovery::find_build_scripts;
pub use error::{GradleError, Result};
pub use expr::SourceExpr;
pub use lint::{builtin_rules, Diagnostic, Finding, LintReport, LintRule, Linter};
pub use model::{
    BuildScript, BuildTypeBlock, ConfigValue, Dsl, EnvLookup, FieldAssignment, PropertiesLoad,
    PropertiesObject, Setting, SigningConfigBlock, SigningRef, SigningRefAt,
};
