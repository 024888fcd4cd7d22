//! Built-in lint rules

use keystead_core::config::validation::is_valid_env_name;
use keystead_core::config::{CredentialField, LintSeverity};

use super::{Finding, LintRule};
use crate::expr::SourceExpr;
use crate::model::{BuildScript, ConfigValue, SigningConfigBlock, SigningRef};

/// AGP always provides this signing config
const DEBUG: &str = "debug";
const RELEASE: &str = "release";

/// Every built-in rule, in reporting order
pub fn builtin_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(LiteralEnvName),
        Box::new(HardcodedSecret),
        Box::new(UnsignedRelease),
        Box::new(DebugSignedRelease),
        Box::new(UndefinedSigningConfig),
        Box::new(IncompleteSigningConfig),
        Box::new(NoFallback),
        Box::new(UnloadedProperties),
        Box::new(UnguardedPropertiesLoad),
        Box::new(AbsoluteKeystorePath),
        Box::new(DelegatedSdkVersion),
    ]
}

/// Signing configs a release could be signed with
fn release_configs(script: &BuildScript) -> impl Iterator<Item = &SigningConfigBlock> {
    script.signing_configs.iter().filter(|s| s.name != DEBUG)
}

/// Why a string passed to `System.getenv` cannot be a real variable name
pub fn env_name_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("is empty");
    }
    if name.chars().any(char::is_whitespace) {
        return Some("contains whitespace");
    }
    if !is_valid_env_name(name) {
        return Some("contains characters that cannot appear in a variable name");
    }
    if name.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("contains lowercase letters");
    }

    let digits = name.chars().filter(char::is_ascii_digit).count();
    if name.len() >= 16 && !name.contains('_') && digits >= 3 {
        return Some("looks like a generated secret");
    }

    None
}

/// Show enough of a suspected secret to find it, not to use it
fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(2).collect();
    format!("{}… ({} chars)", prefix, value.chars().count())
}

fn is_absolute_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('~')
        || path.starts_with("\\\\")
        || (bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && matches!(bytes[2], b'\\' | b'/'))
}

pub struct LiteralEnvName;

impl LintRule for LiteralEnvName {
    fn id(&self) -> &'static str {
        "literal-env-name"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Error
    }

    fn description(&self) -> &'static str {
        "A value passed where an environment variable name is expected"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        script
            .env_lookups
            .iter()
            .filter_map(|lookup| {
                let name = lookup.name.as_deref()?;
                let problem = env_name_problem(name)?;
                Some(
                    Finding::new(
                        lookup.line,
                        format!(
                            "environment variable name \"{}\" {}; the lookup returns null at build time",
                            mask(name),
                            problem
                        ),
                    )
                    .with_help(
                        "Pass the variable's name (e.g. System.getenv(\"STORE_PASSWORD\")) and keep the value in the CI secret store",
                    ),
                )
            })
            .collect()
    }
}

pub struct HardcodedSecret;

impl LintRule for HardcodedSecret {
    fn id(&self) -> &'static str {
        "hardcoded-secret"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Error
    }

    fn description(&self) -> &'static str {
        "A store or key password written into the build script"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        let mut findings = Vec::new();

        for config in release_configs(script) {
            for field in [CredentialField::StorePassword, CredentialField::KeyPassword] {
                let Some(assignment) = config.field(field) else { continue };
                if assignment.expr.literals().is_empty() {
                    continue;
                }

                let how = match assignment.expr {
                    SourceExpr::Literal(_) => "is hardcoded",
                    _ => "falls back to a hardcoded value",
                };
                findings.push(
                    Finding::new(
                        assignment.line,
                        format!("{} of signing config '{}' {}", field.property_key(), config.name, how),
                    )
                    .with_help("Read it from an environment variable or key.properties"),
                );
            }
        }

        findings
    }
}

pub struct UnsignedRelease;

impl LintRule for UnsignedRelease {
    fn id(&self) -> &'static str {
        "unsigned-release"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Error
    }

    fn description(&self) -> &'static str {
        "The release build type has no signing config"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        if !script.has_android_block {
            return Vec::new();
        }

        let Some(release) = script.build_type(RELEASE) else {
            if script.is_application {
                return vec![Finding::new(
                    None,
                    "no release build type is configured, so release builds are unsigned",
                )
                .with_help("Add buildTypes { release { signingConfig = signingConfigs.getByName(\"release\") } }")];
            }
            return Vec::new();
        };

        match &release.signing_config {
            None => vec![Finding::new(
                release.line,
                "release build type has no signingConfig, so release builds are unsigned",
            )],
            Some(at) if at.target == SigningRef::Null => vec![Finding::new(
                at.line,
                "release build type sets signingConfig to null",
            )],
            Some(_) => Vec::new(),
        }
    }
}

pub struct DebugSignedRelease;

impl LintRule for DebugSignedRelease {
    fn id(&self) -> &'static str {
        "debug-signed-release"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn description(&self) -> &'static str {
        "The release build type is signed with the debug key"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        let Some(release) = script.build_type(RELEASE) else {
            return Vec::new();
        };
        match &release.signing_config {
            Some(at) if at.target == SigningRef::Named(DEBUG.to_string()) => vec![Finding::new(
                at.line,
                "release build type is signed with the debug key; stores reject debug-signed uploads",
            )
            .with_help("Declare a release signing config and use signingConfigs.getByName(\"release\")")],
            _ => Vec::new(),
        }
    }
}

pub struct UndefinedSigningConfig;

impl LintRule for UndefinedSigningConfig {
    fn id(&self) -> &'static str {
        "undefined-signing-config"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Error
    }

    fn description(&self) -> &'static str {
        "A build type references a signing config that is not declared"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        script
            .build_types
            .iter()
            .filter_map(|build_type| {
                let at = build_type.signing_config.as_ref()?;
                let SigningRef::Named(name) = &at.target else {
                    return None;
                };
                if name == DEBUG || script.signing_config(name).is_some() {
                    return None;
                }
                Some(Finding::new(
                    at.line,
                    format!(
                        "build type '{}' uses signing config '{}', which is not declared in signingConfigs",
                        build_type.name, name
                    ),
                ))
            })
            .collect()
    }
}

pub struct IncompleteSigningConfig;

impl LintRule for IncompleteSigningConfig {
    fn id(&self) -> &'static str {
        "incomplete-signing-config"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Error
    }

    fn description(&self) -> &'static str {
        "A signing config that does not set all four attributes"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        release_configs(script)
            .filter_map(|config| {
                let missing = config.missing_fields();
                if missing.is_empty() {
                    return None;
                }
                let names: Vec<_> = missing.iter().map(|f| f.property_key()).collect();
                Some(Finding::new(
                    config.line,
                    format!("signing config '{}' does not set {}", config.name, names.join(", ")),
                ))
            })
            .collect()
    }
}

pub struct NoFallback;

impl LintRule for NoFallback {
    fn id(&self) -> &'static str {
        "no-fallback"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn description(&self) -> &'static str {
        "A signing attribute read only from an environment variable"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        let mut findings = Vec::new();

        for config in release_configs(script) {
            for (field, assignment) in &config.fields {
                if !assignment.expr.is_env_only() {
                    continue;
                }
                let vars = assignment.expr.env_vars().join(", ");
                findings.push(
                    Finding::new(
                        assignment.line,
                        format!(
                            "{} of signing config '{}' only comes from ${}; when it is unset the value is silently null",
                            field.property_key(),
                            config.name,
                            vars
                        ),
                    )
                    .with_help(format!(
                        "Fall back to key.properties, e.g. System.getenv(\"{}\") ?: keystoreProperties[\"{}\"]",
                        vars,
                        field.property_key()
                    )),
                );
            }
        }

        findings
    }
}

pub struct UnloadedProperties;

impl LintRule for UnloadedProperties {
    fn id(&self) -> &'static str {
        "unloaded-properties"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn description(&self) -> &'static str {
        "A property lookup against an object never loaded from a file"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        let mut findings = Vec::new();

        for config in &script.signing_configs {
            for assignment in config.fields.values() {
                for (object, key) in assignment.expr.properties() {
                    let loaded = script
                        .properties_object(object)
                        .is_some_and(|p| p.load.is_some());
                    if loaded {
                        continue;
                    }
                    findings.push(Finding::new(
                        assignment.line,
                        format!("'{}' is read from {}, which is never loaded from a file", key, object),
                    ));
                }
            }
        }

        findings
    }
}

pub struct UnguardedPropertiesLoad;

impl LintRule for UnguardedPropertiesLoad {
    fn id(&self) -> &'static str {
        "unguarded-properties-load"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Info
    }

    fn description(&self) -> &'static str {
        "Properties loaded without checking the file exists"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        script
            .properties
            .iter()
            .filter_map(|object| {
                let load = object.load.as_ref().filter(|l| !l.guarded)?;
                let file = load.file.as_deref().unwrap_or("its file");
                Some(
                    Finding::new(
                        load.line,
                        format!(
                            "{} is loaded from {} without an exists() check; builds fail where the file is absent",
                            object.name, file
                        ),
                    )
                    .with_help("Wrap the load in if (file.exists()) { ... }"),
                )
            })
            .collect()
    }
}

pub struct AbsoluteKeystorePath;

impl LintRule for AbsoluteKeystorePath {
    fn id(&self) -> &'static str {
        "absolute-keystore-path"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Warning
    }

    fn description(&self) -> &'static str {
        "A keystore path that only exists on one machine"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        let mut findings = Vec::new();

        for config in &script.signing_configs {
            let Some(assignment) = config.field(CredentialField::StoreFile) else { continue };
            for path in assignment.expr.literals() {
                if is_absolute_path(path) {
                    findings.push(
                        Finding::new(
                            assignment.line,
                            format!("storeFile of signing config '{}' is the absolute path {}", config.name, path),
                        )
                        .with_help("Use a path relative to the project, or read it from STORE_FILE"),
                    );
                }
            }
        }

        findings
    }
}

pub struct DelegatedSdkVersion;

impl LintRule for DelegatedSdkVersion {
    fn id(&self) -> &'static str {
        "delegated-sdk-version"
    }

    fn default_severity(&self) -> LintSeverity {
        LintSeverity::Info
    }

    fn description(&self) -> &'static str {
        "An SDK level supplied by the Flutter Gradle plugin"
    }

    fn check(&self, script: &BuildScript) -> Vec<Finding> {
        [
            ("compileSdk", &script.compile_sdk),
            ("minSdk", &script.min_sdk),
            ("targetSdk", &script.target_sdk),
        ]
        .into_iter()
        .filter_map(|(label, setting)| {
            let setting = setting.as_ref()?;
            let ConfigValue::Delegated(expr) = &setting.value else {
                return None;
            };
            Some(Finding::new(
                setting.line,
                format!("{} comes from {} and changes with the Flutter SDK", label, expr),
            ))
        })
        .collect()
    }
}
