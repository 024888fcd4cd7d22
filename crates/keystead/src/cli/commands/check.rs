//! Check command - resolve credentials and verify the keystore

use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{info, warn};

use keystead_signing::{
    Environment, KeystoreFile, KeystoreInspector, KeytoolInspector, ProcessEnvironment,
    SigningDescriptor, SigningError,
};

use super::resolve::ResolveArgs;
use crate::cli::context::ProjectContext;
use crate::cli::{output, Cli, OutputFormat};
use crate::exit_codes;

/// Resolve credentials and verify the keystore they point at
#[derive(Debug, Args)]
pub struct CheckCommand {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Also open the keystore with keytool and look up the key alias
    #[arg(long)]
    pub keytool: bool,

    /// keytool binary to use instead of the one on PATH or under JAVA_HOME
    #[arg(long, value_name = "PATH", requires = "keytool")]
    pub keytool_path: Option<PathBuf>,
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// A named check and its outcome
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
        }
    }
}

impl CheckCommand {
    /// Execute the check command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            variant = %self.resolve.variant,
            keytool = self.keytool,
            "executing check command"
        );
        let ctx = ProjectContext::load()?;
        let results = self.run_checks(&ctx, &ProcessEnvironment)?;
        let passed = results.iter().all(|r| r.status != CheckStatus::Fail);

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "variant": self.resolve.variant,
                    "passed": passed,
                    "checks": results,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    print_text(&self.resolve.variant, &results, passed);
                }
            }
        }

        if !passed {
            std::process::exit(exit_codes::CONFIG_ERROR);
        }

        Ok(())
    }

    /// Run every check that applies, stopping early when credentials do not resolve
    pub fn run_checks(&self, ctx: &ProjectContext, env: &dyn Environment) -> anyhow::Result<Vec<CheckResult>> {
        let mut results = Vec::new();

        let resolution = match ctx.resolve(env, &self.resolve.request()) {
            Ok(resolution) => resolution,
            Err(err) => match err.downcast::<SigningError>() {
                Ok(err) => {
                    results.push(CheckResult::new("credentials", CheckStatus::Fail, err.to_string()));
                    return Ok(results);
                }
                Err(err) => return Err(err),
            },
        };

        let descriptor = &resolution.descriptor;
        if descriptor.is_complete() {
            results.push(CheckResult::new(
                "credentials",
                CheckStatus::Pass,
                "all four attributes resolved",
            ));
        } else {
            let unresolved: Vec<String> = descriptor.unresolved().iter().map(ToString::to_string).collect();
            results.push(CheckResult::new(
                "credentials",
                CheckStatus::Warn,
                format!("unresolved: {}", unresolved.join(", ")),
            ));
        }

        for warning in &resolution.warnings {
            results.push(CheckResult::new("resolution", CheckStatus::Warn, warning.to_string()));
        }

        let Some(store_file) = descriptor.store_file() else {
            return Ok(results);
        };

        let keystore = match KeystoreFile::inspect(store_file) {
            Ok(keystore) => keystore,
            Err(err) => {
                results.push(CheckResult::new("keystore", CheckStatus::Fail, err.to_string()));
                return Ok(results);
            }
        };

        let summary = format!(
            "{} ({}, {} bytes, SHA-256 {})",
            keystore.path.display(),
            keystore.format,
            keystore.size,
            keystore.sha256
        );
        if keystore.is_recognized() {
            results.push(CheckResult::new("keystore", CheckStatus::Pass, summary));
        } else {
            results.push(CheckResult::new(
                "keystore",
                CheckStatus::Warn,
                format!("{}: format not recognised", summary),
            ));
        }

        if self.keytool {
            results.push(self.check_alias(descriptor)?);
        }

        Ok(results)
    }

    fn check_alias(&self, descriptor: &SigningDescriptor) -> anyhow::Result<CheckResult> {
        let (Some(store_file), Some(password), Some(alias)) = (
            descriptor.store_file(),
            descriptor.store_password(),
            descriptor.key_alias(),
        ) else {
            return Ok(CheckResult::new(
                "alias",
                CheckStatus::Warn,
                "skipped: store password or key alias unresolved",
            ));
        };

        let inspector = match &self.keytool_path {
            Some(path) => KeytoolInspector::with_path(path),
            None => KeytoolInspector::new(),
        };

        let runtime = tokio::runtime::Runtime::new()?;
        let result = match runtime.block_on(inspector.find_alias(store_file, password, alias)) {
            Ok(entry) => CheckResult::new(
                "alias",
                CheckStatus::Pass,
                match entry.entry_type {
                    Some(kind) => format!("'{}' found ({})", entry.alias, kind),
                    None => format!("'{}' found", entry.alias),
                },
            ),
            Err(err @ SigningError::ToolNotFound { .. }) => {
                warn!(error = %err, "skipping alias check");
                CheckResult::new("alias", CheckStatus::Warn, format!("skipped: {}", err))
            }
            Err(err) => CheckResult::new("alias", CheckStatus::Fail, err.to_string()),
        };

        Ok(result)
    }
}

fn print_text(variant: &str, results: &[CheckResult], passed: bool) {
    println!("{}", output::header(&format!("Signing check for '{}'", variant)));
    println!();

    for result in results {
        let marker = match result.status {
            CheckStatus::Pass => style("✓").green(),
            CheckStatus::Warn => style("!").yellow(),
            CheckStatus::Fail => style("✗").red(),
        };
        println!("  {} {}: {}", marker, style(&result.name).bold(), result.message);
    }

    println!();
    if passed {
        output::success("Signing configuration is usable");
    } else {
        output::error("Signing configuration has problems");
    }
}
