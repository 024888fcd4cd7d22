//! Signing lint for Gradle build scripts.
//!
//! Each rule inspects a parsed [`BuildScript`] and reports findings. The
//! [`Linter`] attaches the rule id and the effective severity, which can be
//! changed or disabled per rule from the `[lint]` section of the config file.
//!
//! ## Example
//!
//! ```rust
//! use keystead_gradle::{BuildScript, Dsl, Linter};
//!
//! let script = BuildScript::parse(
//!     "android {\n    buildTypes {\n        release {\n            signingConfig = signingConfigs.getByName(\"debug\")\n        }\n    }\n}\n",
//!     Dsl::Kotlin,
//! ).unwrap();
//!
//! let report = Linter::new().lint(&script);
//! assert_eq!(report.diagnostics[0].rule, "debug-signed-release");
//! ```

mod rules;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use keystead_core::config::{LintConfig, LintSeverity};

use crate::error::{GradleError, Result};
use crate::model::BuildScript;

pub use rules::builtin_rules;

/// What a rule found, before severity is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// 1-based line, when the finding points at one
    pub line: Option<usize>,
    pub message: String,
    pub help: Option<String>,
}

impl Finding {
    pub fn new(line: impl Into<Option<usize>>, message: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            message: message.into(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// A lint rule
pub trait LintRule: Send + Sync {
    /// Stable identifier used in configuration
    fn id(&self) -> &'static str;

    /// Severity unless configured otherwise
    fn default_severity(&self) -> LintSeverity;

    /// One-line description
    fn description(&self) -> &'static str;

    /// Inspect a script
    fn check(&self, script: &BuildScript) -> Vec<Finding>;
}

/// A reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: LintSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}[{}] line {}: {}", self.severity, self.rule, line, self.message),
            None => write!(f, "{}[{}]: {}", self.severity, self.rule, self.message),
        }
    }
}

/// Diagnostics for one script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LintReport {
    pub path: Option<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    fn count(&self, severity: LintSeverity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(LintSeverity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(LintSeverity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(LintSeverity::Info)
    }

    /// No diagnostics at all
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// No errors, and no warnings when `strict`
    pub fn passed(&self, strict: bool) -> bool {
        self.error_count() == 0 && (!strict || self.warning_count() == 0)
    }
}

/// Runs the enabled rules with their effective severities
pub struct Linter {
    rules: Vec<Box<dyn LintRule>>,
    disabled: BTreeSet<String>,
    severity: BTreeMap<String, LintSeverity>,
    strict: bool,
}

impl Linter {
    /// All built-in rules at their default severities
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
            disabled: BTreeSet::new(),
            severity: BTreeMap::new(),
            strict: false,
        }
    }

    /// Apply the `[lint]` section of a config file
    pub fn from_config(config: &LintConfig) -> Result<Self> {
        let mut linter = Self::new();
        let known: BTreeSet<&str> = linter.rules.iter().map(|r| r.id()).collect();

        for id in config.disabled.iter().chain(config.severity.keys()) {
            if !known.contains(id.as_str()) {
                return Err(GradleError::UnknownRule(id.clone()));
            }
        }

        linter.disabled = config.disabled.iter().cloned().collect();
        linter.severity = config.severity.clone();
        linter.strict = config.strict;
        Ok(linter)
    }

    /// Treat warnings as failures
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Enabled rules and their effective severities
    pub fn rules(&self) -> Vec<(&dyn LintRule, LintSeverity)> {
        self.rules
            .iter()
            .filter(|r| !self.disabled.contains(r.id()))
            .map(|r| (r.as_ref(), self.severity_of(r.as_ref())))
            .collect()
    }

    fn severity_of(&self, rule: &dyn LintRule) -> LintSeverity {
        self.severity
            .get(rule.id())
            .copied()
            .unwrap_or_else(|| rule.default_severity())
    }

    /// Lint a parsed script
    pub fn lint(&self, script: &BuildScript) -> LintReport {
        let mut diagnostics = Vec::new();

        for (rule, severity) in self.rules() {
            for finding in rule.check(script) {
                diagnostics.push(Diagnostic {
                    rule: rule.id().to_string(),
                    severity,
                    line: finding.line,
                    message: finding.message,
                    help: finding.help,
                });
            }
        }

        diagnostics.sort_by(|a, b| {
            a.line
                .unwrap_or(0)
                .cmp(&b.line.unwrap_or(0))
                .then_with(|| b.severity.cmp(&a.severity))
        });

        debug!(
            path = ?script.path,
            diagnostics = diagnostics.len(),
            "linted build script"
        );

        LintReport {
            path: script.path.clone(),
            diagnostics,
        }
    }

    /// Read, parse and lint a script file
    pub fn lint_path(&self, path: &Path) -> Result<LintReport> {
        let script = BuildScript::load(path)?;
        Ok(self.lint(&script))
    }
}

impl Default for Linter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dsl;
    use tempfile::TempDir;

    const DEBUG_SIGNED: &str = r#"android {
    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("debug")
        }
    }
}
"#;

    fn script(content: &str) -> BuildScript {
        BuildScript::parse(content, Dsl::Kotlin).unwrap()
    }

    #[test]
    fn test_default_linter_reports_rule_and_severity() {
        let report = Linter::new().lint(&script(DEBUG_SIGNED));
        assert_eq!(report.diagnostics.len(), 1);

        let diagnostic = &report.diagnostics[0];
        assert_eq!(diagnostic.rule, "debug-signed-release");
        assert_eq!(diagnostic.severity, LintSeverity::Warning);
        assert_eq!(diagnostic.line, Some(4));
        assert!(report.passed(false));
        assert!(!report.passed(true));
    }

    #[test]
    fn test_config_overrides_severity() {
        let mut config = LintConfig::default();
        config
            .severity
            .insert("debug-signed-release".to_string(), LintSeverity::Error);

        let report = Linter::from_config(&config).unwrap().lint(&script(DEBUG_SIGNED));
        assert_eq!(report.error_count(), 1);
        assert!(!report.passed(false));
    }

    #[test]
    fn test_config_disables_rule() {
        let config = LintConfig {
            disabled: vec!["debug-signed-release".to_string()],
            ..LintConfig::default()
        };

        let linter = Linter::from_config(&config).unwrap();
        assert!(linter.lint(&script(DEBUG_SIGNED)).is_clean());
        assert!(linter.rules().iter().all(|(r, _)| r.id() != "debug-signed-release"));
    }

    #[test]
    fn test_unknown_rule_in_config() {
        let config = LintConfig {
            disabled: vec!["no-such-rule".to_string()],
            ..LintConfig::default()
        };
        assert!(matches!(
            Linter::from_config(&config),
            Err(GradleError::UnknownRule(id)) if id == "no-such-rule"
        ));
    }

    #[test]
    fn test_strict_from_config() {
        let config = LintConfig {
            strict: true,
            ..LintConfig::default()
        };
        assert!(Linter::from_config(&config).unwrap().is_strict());
        assert!(!Linter::new().is_strict());
        assert!(Linter::new().strict(true).is_strict());
    }

    #[test]
    fn test_lint_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("build.gradle.kts");
        std::fs::write(&path, DEBUG_SIGNED).unwrap();

        let report = Linter::new().lint_path(&path).unwrap();
        assert_eq!(report.path.as_deref(), Some(path.as_path()));
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic {
            rule: "no-fallback".to_string(),
            severity: LintSeverity::Warning,
            line: Some(12),
            message: "storeFile only comes from env X".to_string(),
            help: None,
        };
        assert_eq!(
            diagnostic.to_string(),
            "warning[no-fallback] line 12: storeFile only comes from env X"
        );
    }
}
