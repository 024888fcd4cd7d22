//! Lint command - check Gradle build scripts for signing mistakes

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use keystead_core::config::LintSeverity;
use keystead_gradle::{find_build_scripts, LintReport, Linter};

use crate::cli::context::ProjectContext;
use crate::cli::{output, Cli, OutputFormat};
use crate::exit_codes;

/// Lint Gradle build scripts
#[derive(Debug, Args)]
pub struct LintCommand {
    /// Build scripts or directories to lint (defaults to the project root)
    pub paths: Vec<PathBuf>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,

    /// List the available rules and exit
    #[arg(long)]
    pub list_rules: bool,
}

impl LintCommand {
    /// Execute the lint command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(paths = ?self.paths, strict = self.strict, "executing lint command");
        let ctx = ProjectContext::load()?;

        let mut linter = Linter::from_config(&ctx.config.lint)?;
        if self.strict {
            linter = linter.strict(true);
        }

        if self.list_rules {
            return list_rules(&linter, cli);
        }

        let reports = self.lint_all(&ctx, &linter)?;
        let strict = linter.is_strict();
        let passed = reports.iter().all(|r| r.passed(strict));

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "passed": passed,
                    "strict": strict,
                    "reports": reports,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    print_text(&ctx, &reports, passed);
                }
            }
        }

        if !passed {
            std::process::exit(exit_codes::VALIDATION_ERROR);
        }

        Ok(())
    }

    /// Lint every build script under the requested paths
    pub fn lint_all(&self, ctx: &ProjectContext, linter: &Linter) -> anyhow::Result<Vec<LintReport>> {
        let roots = if self.paths.is_empty() {
            vec![ctx.project_root.clone()]
        } else {
            self.paths.iter().map(|p| ctx.absolute(p)).collect()
        };

        let mut reports = Vec::new();
        for root in roots {
            if !root.exists() {
                anyhow::bail!("Path not found: {}", root.display());
            }
            for script in find_build_scripts(&root)? {
                reports.push(linter.lint_path(&script)?);
            }
        }

        Ok(reports)
    }
}

fn list_rules(linter: &Linter, cli: &Cli) -> anyhow::Result<()> {
    let rules = linter.rules();

    match cli.format {
        OutputFormat::Json => {
            let output: Vec<_> = rules
                .iter()
                .map(|(rule, severity)| {
                    serde_json::json!({
                        "id": rule.id(),
                        "severity": severity,
                        "description": rule.description(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            for (rule, severity) in rules {
                println!(
                    "{:<26} {:<8} {}",
                    style(rule.id()).bold(),
                    output::severity_style(severity).apply_to(severity),
                    rule.description()
                );
            }
        }
    }

    Ok(())
}

fn print_text(ctx: &ProjectContext, reports: &[LintReport], passed: bool) {
    if reports.is_empty() {
        output::warning(&format!(
            "No build.gradle or build.gradle.kts found under {}",
            ctx.project_root.display()
        ));
        return;
    }

    for report in reports.iter().filter(|r| !r.is_clean()) {
        if let Some(path) = &report.path {
            let shown = path.strip_prefix(&ctx.cwd).unwrap_or(path);
            println!("{}", output::path_style().apply_to(shown.display()));
        }

        for diagnostic in &report.diagnostics {
            let location = diagnostic
                .line
                .map(|line| format!("line {}: ", line))
                .unwrap_or_default();
            println!(
                "  {}[{}] {}{}",
                output::severity_style(diagnostic.severity).apply_to(diagnostic.severity),
                diagnostic.rule,
                location,
                diagnostic.message
            );
            if let Some(help) = &diagnostic.help {
                println!("    {} {}", style("help:").dim(), help);
            }
        }
        println!();
    }

    let count = |severity: LintSeverity| -> usize {
        reports
            .iter()
            .map(|r| match severity {
                LintSeverity::Error => r.error_count(),
                LintSeverity::Warning => r.warning_count(),
                LintSeverity::Info => r.info_count(),
            })
            .sum()
    };
    let summary = format!(
        "{} script(s) checked: {} error(s), {} warning(s), {} note(s)",
        reports.len(),
        count(LintSeverity::Error),
        count(LintSeverity::Warning),
        count(LintSeverity::Info)
    );

    if passed {
        output::success(&summary);
    } else {
        output::error(&summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LITERAL_ENV_SCRIPT: &str = r#"plugins {
    id("com.android.application")
}
android {
    namespace = "com.example.app"
    signingConfigs {
        create("release") {
            storeFile = file(System.getenv("STORE_FILE") ?: "upload.jks")
            storePassword = System.getenv("Darvin@2024!")
            keyAlias = System.getenv("KEY_ALIAS")
            keyPassword = System.getenv("KEY_PASSWORD")
        }
    }
    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("release")
        }
    }
}
"#;

    fn write(root: &std::path::Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_lint_flags_literal_env_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "android/app/build.gradle.kts", LITERAL_ENV_SCRIPT);
        write(temp.path(), "android/app/build/tmp/build.gradle.kts", LITERAL_ENV_SCRIPT);

        let ctx = ProjectContext::discover(temp.path()).unwrap();
        let cmd = LintCommand {
            paths: vec![],
            strict: false,
            list_rules: false,
        };
        let reports = cmd.lint_all(&ctx, &Linter::new()).unwrap();

        assert_eq!(reports.len(), 1);
        let diagnostic = reports[0]
            .diagnostics
            .iter()
            .find(|d| d.rule == "literal-env-name")
            .unwrap();
        assert_eq!(diagnostic.line, Some(9));
        assert!(!diagnostic.message.contains("Darvin@2024!"));
        assert!(!reports[0].passed(false));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::discover(temp.path()).unwrap();
        let cmd = LintCommand {
            paths: vec![PathBuf::from("nope")],
            strict: false,
            list_rules: false,
        };
        assert!(cmd.lint_all(&ctx, &Linter::new()).is_err());
    }
}
