//! Resolve command

use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use keystead_core::config::{CredentialField, RELEASE_VARIANT};
use keystead_signing::{ProcessEnvironment, Provenance, Resolution, ResolutionWarning};

use crate::cli::context::{ProjectContext, ResolveRequest};
use crate::cli::{output, Cli, OutputFormat};

/// Where to read credential sources from, shared by commands that resolve
#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// Build variant to resolve
    #[arg(long, default_value = RELEASE_VARIANT)]
    pub variant: String,

    /// Take credential sources from a Gradle build script instead of configuration
    #[arg(long, value_name = "SCRIPT")]
    pub from_gradle: Option<PathBuf>,

    /// Properties file to fall back to
    #[arg(long, value_name = "FILE")]
    pub properties: Option<PathBuf>,

    /// Fail when an env entry is not an environment variable name
    #[arg(long)]
    pub strict_env_names: bool,
}

impl ResolveArgs {
    /// The resolution request these arguments describe
    pub fn request(&self) -> ResolveRequest {
        ResolveRequest {
            variant: self.variant.clone(),
            from_gradle: self.from_gradle.clone(),
            properties: self.properties.clone(),
            strict_env_names: self.strict_env_names,
        }
    }
}

/// Resolve the signing credentials for a build variant
#[derive(Debug, Args)]
pub struct ResolveCommand {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Print secret values instead of redacting them
    #[arg(long)]
    pub reveal: bool,
}

/// One attribute as printed
#[derive(Debug, Serialize)]
struct FieldView<'a> {
    field: CredentialField,
    value: Option<String>,
    provenance: Option<&'a Provenance>,
}

/// A resolution as printed
#[derive(Debug, Serialize)]
struct ResolutionView<'a> {
    variant: &'a str,
    complete: bool,
    fields: Vec<FieldView<'a>>,
    warnings: &'a [ResolutionWarning],
}

impl<'a> ResolutionView<'a> {
    fn new(resolution: &'a Resolution, reveal: bool) -> Self {
        let descriptor = &resolution.descriptor;
        let fields = CredentialField::ALL
            .into_iter()
            .map(|field| FieldView {
                field,
                value: descriptor.display_value(field, reveal),
                provenance: descriptor.provenance(field),
            })
            .collect();

        Self {
            variant: &descriptor.variant,
            complete: descriptor.is_complete(),
            fields,
            warnings: &resolution.warnings,
        }
    }
}

impl ResolveCommand {
    /// Execute the resolve command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            variant = %self.resolve.variant,
            from_gradle = ?self.resolve.from_gradle,
            "executing resolve command"
        );
        let ctx = ProjectContext::load()?;
        let resolution = ctx.resolve(&ProcessEnvironment, &self.resolve.request())?;
        let view = ResolutionView::new(&resolution, self.reveal);

        match cli.format {
            OutputFormat::Json => output::json(&view)?,
            OutputFormat::Text => {
                if !cli.quiet {
                    print_text(&view);
                }
            }
        }

        Ok(())
    }
}

fn print_text(view: &ResolutionView<'_>) {
    println!(
        "{}",
        output::header(&format!("Signing credentials for '{}'", view.variant))
    );
    println!();

    for field in &view.fields {
        let line = match (&field.value, field.provenance) {
            (Some(value), Some(provenance)) => {
                format!("{} {}", value, style(format!("({})", provenance)).dim())
            }
            _ => style("unresolved").red().to_string(),
        };
        println!("{}", output::key_value(&field.field.to_string(), &line));
    }

    if !view.warnings.is_empty() {
        println!();
        for warning in view.warnings {
            output::warning(&warning.to_string());
        }
    }

    println!();
    if view.complete {
        output::success("All signing attributes resolved");
    } else {
        output::warning("Some signing attributes are unresolved (variant is optional)");
    }
}
