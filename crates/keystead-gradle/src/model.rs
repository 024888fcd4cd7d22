//! What a build script declares about signing

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use keystead_core::config::validation::is_valid_env_name;
use keystead_core::config::{CredentialField, VariantConfig};

use crate::expr::{SourceExpr, REDACTED};

/// Script dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dsl {
    /// `build.gradle.kts`
    Kotlin,
    /// `build.gradle`
    Groovy,
}

impl Dsl {
    /// Guess the dialect from a file name
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".gradle.kts") {
            Some(Self::Kotlin)
        } else if name.ends_with(".gradle") {
            Some(Self::Groovy)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Dsl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kotlin => write!(f, "Kotlin"),
            Self::Groovy => write!(f, "Groovy"),
        }
    }
}

/// A scalar build setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConfigValue {
    Int(i64),
    Str(String),
    Bool(bool),
    /// Taken from the Flutter Gradle plugin, e.g. `flutter.minSdkVersion`
    Delegated(String),
    /// Any other expression
    Expr(String),
}

impl ConfigValue {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Ok(n) = text.parse::<i64>() {
            return Self::Int(n);
        }
        match text {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Some(s) = crate::expr::string_literal(text) {
            return Self::Str(s);
        }
        if text.starts_with("flutter.") {
            return Self::Delegated(text.to_string());
        }
        Self::Expr(text.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self, Self::Delegated(_))
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "\"{}\"", s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Delegated(e) | Self::Expr(e) => write!(f, "{}", e),
        }
    }
}

/// A setting and the line it was found on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    pub value: ConfigValue,
    pub line: usize,
}

/// A `java.util.Properties` object declared in the script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertiesObject {
    /// Variable name
    pub name: String,
    /// Line of the declaration
    pub line: usize,
    /// Where `load` happens, if it does
    pub load: Option<PropertiesLoad>,
}

/// A `props.load(...)` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertiesLoad {
    /// Line of the call
    pub line: usize,
    /// File path as written, when it can be determined
    pub file: Option<String>,
    /// Whether the load only runs when the file exists
    pub guarded: bool,
}

/// One signing attribute assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldAssignment {
    pub expr: SourceExpr,
    pub raw: String,
    pub line: usize,
}

/// A block inside `signingConfigs { }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningConfigBlock {
    pub name: String,
    pub line: usize,
    pub fields: BTreeMap<CredentialField, FieldAssignment>,
}

impl SigningConfigBlock {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, field: CredentialField) -> Option<&FieldAssignment> {
        self.fields.get(&field)
    }

    /// Attributes never assigned
    pub fn missing_fields(&self) -> Vec<CredentialField> {
        CredentialField::ALL
            .into_iter()
            .filter(|f| !self.fields.contains_key(f))
            .collect()
    }

    /// Equivalent resolver configuration for this block
    pub fn to_variant_config(&self) -> VariantConfig {
        let mut variant = VariantConfig::default();
        for field in CredentialField::ALL {
            *variant.source_mut(field) = self
                .fields
                .get(&field)
                .map(|a| a.expr.to_credential_source())
                .unwrap_or_default();
        }
        variant
    }
}

/// What a build type's `signingConfig` points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SigningRef {
    /// A named signing config
    Named(String),
    /// Explicitly `null`
    Null,
    /// Something that could not be followed
    Unknown(String),
}

/// A block inside `buildTypes { }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTypeBlock {
    pub name: String,
    pub line: usize,
    pub signing_config: Option<SigningRefAt>,
    pub minify_enabled: Option<bool>,
    pub shrink_resources: Option<bool>,
}

/// A signing reference and its line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningRefAt {
    pub target: SigningRef,
    pub line: usize,
}

impl BuildTypeBlock {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
            signing_config: None,
            minify_enabled: None,
            shrink_resources: None,
        }
    }

    pub fn signing_target(&self) -> Option<&SigningRef> {
        self.signing_config.as_ref().map(|s| &s.target)
    }
}

/// An environment variable read anywhere in the script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvLookup {
    /// Variable name, when given as a literal
    pub name: Option<String>,
    /// The lookup as written
    pub raw: String,
    pub line: usize,
}

/// Signing-relevant view of one Gradle build script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildScript {
    pub path: Option<PathBuf>,
    pub dsl: Dsl,
    /// Applies `com.android.application`
    pub is_application: bool,
    /// Has an `android { }` block
    pub has_android_block: bool,

    pub namespace: Option<Setting>,
    pub application_id: Option<Setting>,
    pub compile_sdk: Option<Setting>,
    pub min_sdk: Option<Setting>,
    pub target_sdk: Option<Setting>,
    pub ndk_version: Option<Setting>,
    pub version_code: Option<Setting>,
    pub version_name: Option<Setting>,

    pub properties: Vec<PropertiesObject>,
    pub signing_configs: Vec<SigningConfigBlock>,
    pub build_types: Vec<BuildTypeBlock>,
    pub env_lookups: Vec<EnvLookup>,
}

impl BuildScript {
    pub fn empty(dsl: Dsl) -> Self {
        Self {
            path: None,
            dsl,
            is_application: false,
            has_android_block: false,
            namespace: None,
            application_id: None,
            compile_sdk: None,
            min_sdk: None,
            target_sdk: None,
            ndk_version: None,
            version_code: None,
            version_name: None,
            properties: Vec::new(),
            signing_configs: Vec::new(),
            build_types: Vec::new(),
            env_lookups: Vec::new(),
        }
    }

    pub fn signing_config(&self, name: &str) -> Option<&SigningConfigBlock> {
        self.signing_configs.iter().find(|s| s.name == name)
    }

    pub fn build_type(&self, name: &str) -> Option<&BuildTypeBlock> {
        self.build_types.iter().find(|b| b.name == name)
    }

    pub fn properties_object(&self, name: &str) -> Option<&PropertiesObject> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Signing config used by a build type, following the reference
    pub fn signing_config_for(&self, build_type: &str) -> Option<&SigningConfigBlock> {
        match self.build_type(build_type)?.signing_target()? {
            SigningRef::Named(name) => self.signing_config(name),
            _ => None,
        }
    }

    /// Mask password literals so the model can be printed
    pub fn redact_secrets(&mut self) {
        for config in &mut self.signing_configs {
            for (field, assignment) in config.fields.iter_mut() {
                if field.is_secret() && assignment.expr.redacted() != assignment.expr {
                    assignment.expr = assignment.expr.redacted();
                    assignment.raw = assignment.expr.to_string();
                }
            }
        }
        for lookup in &mut self.env_lookups {
            if lookup.name.as_deref().is_some_and(|n| !is_valid_env_name(n)) {
                lookup.name = Some(REDACTED.to_string());
                lookup.raw = REDACTED.to_string();
            }
        }
    }

    /// File a properties object is loaded from, as written
    pub fn properties_file_for(&self, object: &str) -> Option<&str> {
        self.properties_object(object)?.load.as_ref()?.file.as_deref()
    }
}
