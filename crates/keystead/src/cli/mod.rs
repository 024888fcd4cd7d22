//! CLI definition and command handling

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{
    CheckCommand, CompletionsCommand, ExportCommand, InitCommand, InspectCommand, LintCommand,
    ResolveCommand,
};

/// Keystead - Android release-signing credentials and Gradle signing lint
#[derive(Debug, Parser)]
#[command(name = "keystead")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve the signing credentials for a build variant
    Resolve(ResolveCommand),

    /// Resolve credentials and verify the keystore they point at
    Check(CheckCommand),

    /// Lint Gradle build scripts for signing mistakes
    Lint(LintCommand),

    /// Show what a Gradle build script configures
    Inspect(InspectCommand),

    /// Write resolved credentials to a key.properties file
    Export(ExportCommand),

    /// Create a keystead configuration file
    Init(InitCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Resolve(ref cmd) => cmd.execute(&self),
            Commands::Check(ref cmd) => cmd.execute(&self),
            Commands::Lint(ref cmd) => cmd.execute(&self),
            Commands::Inspect(ref cmd) => cmd.execute(&self),
            Commands::Export(ref cmd) => cmd.execute(&self),
            Commands::Init(ref cmd) => cmd.execute(&self),
            Commands::Completions(ref cmd) => cmd.execute(&self),
        }
    }
}
