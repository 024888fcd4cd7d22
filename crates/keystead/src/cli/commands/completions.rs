//! Shell completions generation command

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use tracing::info;

use crate::cli::{output, Cli};

/// Generate shell completions
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CompletionsCommand {
    /// Execute the completions command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(shell = %self.shell, "executing completions command");

        match &self.output {
            Some(path) => {
                let mut file = std::fs::File::create(path)?;
                write_completions(self.shell, &mut file);
                if !cli.quiet {
                    output::success(&format!("Completions written to {}", path.display()));
                }
            }
            None => write_completions(self.shell, &mut std::io::stdout()),
        }

        Ok(())
    }
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    generate(shell, &mut Cli::command(), "keystead", out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Parser, ValueEnum};

    #[test]
    fn test_generates_for_every_shell() {
        for shell in Shell::value_variants() {
            let mut buffer = Vec::new();
            write_completions(*shell, &mut buffer);
            let script = String::from_utf8(buffer).unwrap();
            assert!(script.contains("keystead"), "{shell} completions");
        }
    }

    #[test]
    fn test_parses_shell_names() {
        let cli = Cli::try_parse_from(["keystead", "completions", "zsh"]);
        assert!(cli.is_ok());
        assert!(Cli::try_parse_from(["keystead", "completions", "tcsh"]).is_err());
    }
}
