//! Inspect command - show what a build script configures

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::{debug, info};

use keystead_gradle::{find_build_scripts, BuildScript, ConfigValue, SigningRef};

use crate::cli::context::ProjectContext;
use crate::cli::{output, Cli, OutputFormat};

/// Show the Android configuration a build script declares
#[derive(Debug, Args)]
pub struct InspectCommand {
    /// Build script to read (defaults to the first application module under the project root)
    pub script: Option<PathBuf>,
}

impl InspectCommand {
    /// Execute the inspect command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(script = ?self.script, "executing inspect command");
        let ctx = ProjectContext::load()?;

        let mut script = match &self.script {
            Some(path) => BuildScript::load(&ctx.absolute(path))?,
            None => find_application_script(&ctx.project_root)?,
        };
        script.redact_secrets();

        match cli.format {
            OutputFormat::Json => output::json(&script)?,
            OutputFormat::Text => {
                if !cli.quiet {
                    print_text(&ctx, &script);
                }
            }
        }

        Ok(())
    }
}

/// First build script under `root` that applies the Android application plugin
pub fn find_application_script(root: &Path) -> anyhow::Result<BuildScript> {
    for path in find_build_scripts(root)? {
        match BuildScript::load(&path) {
            Ok(script) if script.is_application => return Ok(script),
            Ok(_) => {}
            Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable script"),
        }
    }

    anyhow::bail!(
        "No Android application build script found under {}",
        root.display()
    )
}

fn setting(value: Option<&keystead_gradle::Setting>) -> String {
    match value.map(|s| &s.value) {
        Some(value @ ConfigValue::Delegated(_)) => format!("{} {}", value, style("(from Flutter)").dim()),
        Some(value) => value.to_string(),
        None => style("not set").dim().to_string(),
    }
}

fn print_text(ctx: &ProjectContext, script: &BuildScript) {
    if let Some(path) = &script.path {
        let shown = path.strip_prefix(&ctx.cwd).unwrap_or(path);
        println!(
            "{} {}",
            output::header("Build script"),
            output::path_style().apply_to(shown.display())
        );
    }
    println!("{}", output::key_value("DSL", &script.dsl.to_string()));
    println!(
        "{}",
        output::key_value(
            "Module",
            if script.is_application { "application" } else { "library or root" }
        )
    );
    println!();

    println!("{}", output::header("Android"));
    for (label, value) in [
        ("namespace", &script.namespace),
        ("applicationId", &script.application_id),
        ("compileSdk", &script.compile_sdk),
        ("minSdk", &script.min_sdk),
        ("targetSdk", &script.target_sdk),
        ("ndkVersion", &script.ndk_version),
        ("versionCode", &script.version_code),
        ("versionName", &script.version_name),
    ] {
        println!("{}", output::key_value(label, &setting(value.as_ref())));
    }

    if !script.properties.is_empty() {
        println!();
        println!("{}", output::header("Properties files"));
        for object in &script.properties {
            let loaded = match &object.load {
                Some(load) => format!(
                    "{} (line {}{})",
                    load.file.as_deref().unwrap_or("?"),
                    load.line,
                    if load.guarded { ", guarded" } else { "" }
                ),
                None => style("never loaded").yellow().to_string(),
            };
            println!("{}", output::key_value(&object.name, &loaded));
        }
    }

    println!();
    println!("{}", output::header("Signing configs"));
    if script.signing_configs.is_empty() {
        println!("  {}", style("none").dim());
    }
    for config in &script.signing_configs {
        println!("  {} {}", style(&config.name).bold(), style(format!("(line {})", config.line)).dim());
        for (field, assignment) in &config.fields {
            println!("    {}: {}", style(field).dim(), assignment.expr);
        }
        for field in config.missing_fields() {
            println!("    {}: {}", style(field).dim(), style("not assigned").yellow());
        }
    }

    println!();
    println!("{}", output::header("Build types"));
    if script.build_types.is_empty() {
        println!("  {}", style("none").dim());
    }
    for build_type in &script.build_types {
        let signing = match build_type.signing_target() {
            Some(SigningRef::Named(name)) => format!("signed with '{}'", name),
            Some(SigningRef::Null) => "explicitly unsigned".to_string(),
            Some(SigningRef::Unknown(expr)) => format!("signed with {}", expr),
            None => "no signing config".to_string(),
        };
        let minify = match build_type.minify_enabled {
            Some(true) => ", minified",
            _ => "",
        };
        println!("  {}: {}{}", style(&build_type.name).bold(), signing, minify);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_finds_application_module() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::write(root.join("build.gradle.kts"), "plugins {\n    id(\"com.android.application\") apply false\n}\n").unwrap();
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::write(
            root.join("app/build.gradle.kts"),
            "plugins {\n    id(\"com.android.application\")\n}\nandroid {\n    namespace = \"com.example.app\"\n}\n",
        )
        .unwrap();

        let script = find_application_script(root).unwrap();
        assert_eq!(script.path.as_deref(), Some(root.join("app/build.gradle.kts").as_path()));
    }

    #[test]
    fn test_no_application_module() {
        let temp = TempDir::new().unwrap();
        assert!(find_application_script(temp.path()).is_err());
    }

    #[test]
    fn test_setting_labels() {
        let delegated = keystead_gradle::Setting {
            value: ConfigValue::Delegated("flutter.minSdkVersion".to_string()),
            line: 3,
        };
        assert!(setting(Some(&delegated)).contains("flutter.minSdkVersion"));
        assert!(setting(None).contains("not set"));
    }
}
