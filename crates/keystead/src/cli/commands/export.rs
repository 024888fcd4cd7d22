//! Export command - write resolved credentials as a properties file

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::info;

use keystead_core::config::{expand_home, CredentialField};
use keystead_signing::properties::format_entry;
use keystead_signing::{ProcessEnvironment, SigningDescriptor};

use super::resolve::ResolveArgs;
use crate::cli::context::ProjectContext;
use crate::cli::{output, Cli};

/// Write the resolved credentials to a `key.properties` file
#[derive(Debug, Args)]
pub struct ExportCommand {
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Output file, or `-` for stdout (defaults to the configured properties file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

impl ExportCommand {
    /// Execute the export command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(variant = %self.resolve.variant, force = self.force, "executing export command");
        let ctx = ProjectContext::load()?;
        let resolution = ctx.resolve(&ProcessEnvironment, &self.resolve.request())?;
        let content = render(&resolution.descriptor)?;

        if self.output.as_deref() == Some(Path::new("-")) {
            std::io::stdout().write_all(content.as_bytes())?;
            return Ok(());
        }

        let path = match &self.output {
            Some(path) => ctx.absolute(path),
            None => ctx.project_root.join(expand_home(&ctx.config.properties_file)),
        };
        write_private(&path, &content, self.force)?;

        if !cli.quiet {
            output::success(&format!(
                "Wrote {} credentials to {}",
                resolution.descriptor.variant,
                output::path_style().apply_to(path.display())
            ));
            output::warning("The file holds passwords; keep it out of version control");
        }

        Ok(())
    }
}

/// Properties file text for a complete descriptor
pub fn render(descriptor: &SigningDescriptor) -> anyhow::Result<String> {
    let unresolved = descriptor.unresolved();
    if !unresolved.is_empty() {
        let names: Vec<String> = unresolved.iter().map(ToString::to_string).collect();
        anyhow::bail!(
            "Cannot export '{}': unresolved {}",
            descriptor.variant,
            names.join(", ")
        );
    }

    let mut content = format!("# Signing credentials for the {} variant\n", descriptor.variant);
    for field in CredentialField::ALL {
        if let Some(value) = descriptor.expose_value(field) {
            content.push_str(&format_entry(field.property_key(), &value));
            content.push('\n');
        }
    }
    Ok(content)
}

/// Write a file only the owner can read
fn write_private(path: &Path, content: &str, force: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = match options.open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        ),
        Err(e) => return Err(e.into()),
    };

    // An existing file keeps its old mode until narrowed here
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content.as_bytes())?;
    Ok(())
}
