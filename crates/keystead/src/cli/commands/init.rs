//! Init command

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use console::style;
use tracing::info;

use keystead_core::config::{
    Config, DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_TOML, DEFAULT_CONFIG_YAML,
};

use crate::cli::Cli;

/// Configuration file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Toml,
}

/// Initialize a new Keystead configuration
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Configuration format
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, format = ?self.config_format, "executing init command");
        let cwd = std::env::current_dir()?;
        let config_path = self.config_path(&cwd);

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Configuration file already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, render(self.config_format)?)?;

        if !cli.quiet {
            println!(
                "{} Created configuration at {}",
                style("✓").green().bold(),
                style(config_path.display()).cyan()
            );
            println!();
            println!("Next steps:");
            println!("  1. Edit {} to name your CI's signing variables", config_path.display());
            println!("  2. Run {} to see where each credential comes from", style("keystead resolve").cyan());
            println!("  3. Run {} to check your Gradle signing setup", style("keystead lint").cyan());
        }

        Ok(())
    }

    fn config_path(&self, cwd: &Path) -> PathBuf {
        match &self.output {
            Some(path) => cwd.join(path),
            None => cwd.join(match self.config_format {
                ConfigFormat::Yaml => DEFAULT_CONFIG_YAML,
                ConfigFormat::Toml => DEFAULT_CONFIG_TOML,
            }),
        }
    }
}

/// Default configuration text in the requested format
pub fn render(format: ConfigFormat) -> anyhow::Result<String> {
    match format {
        ConfigFormat::Yaml => Ok(DEFAULT_CONFIG_TEMPLATE.to_string()),
        ConfigFormat::Toml => {
            let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE)?;
            Ok(toml::to_string_pretty(&config)?)
        }
    }
}
