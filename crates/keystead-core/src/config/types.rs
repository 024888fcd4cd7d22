//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name of the variant that must always be signable
pub const RELEASE_VARIANT: &str = "release";

/// Main configuration for Keystead
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version of the config schema
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Project name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Gradle root project directory, relative to the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,

    /// Properties file holding fallback credentials, relative to the project root
    pub properties_file: PathBuf,

    /// Credential sources per build variant
    pub variants: BTreeMap<String, VariantConfig>,

    /// Resolution behaviour
    pub resolution: ResolutionConfig,

    /// Lint configuration
    pub lint: LintConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut variants = BTreeMap::new();
        variants.insert(RELEASE_VARIANT.to_string(), VariantConfig::default());

        Self {
            schema: None,
            name: None,
            project_root: None,
            properties_file: PathBuf::from("key.properties"),
            variants,
            resolution: ResolutionConfig::default(),
            lint: LintConfig::default(),
        }
    }
}

impl Config {
    /// Look up a variant by name
    pub fn variant(&self, name: &str) -> Option<&VariantConfig> {
        self.variants.get(name)
    }
}

/// The four attributes of a signing credential descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    /// Keystore file location
    StoreFile,
    /// Keystore password
    StorePassword,
    /// Key alias inside the keystore
    KeyAlias,
    /// Password of the key entry
    KeyPassword,
}

impl CredentialField {
    /// All fields, in descriptor order
    pub const ALL: [CredentialField; 4] = [
        Self::StoreFile,
        Self::StorePassword,
        Self::KeyAlias,
        Self::KeyPassword,
    ];

    /// Key used in `key.properties` and in Gradle `signingConfigs` blocks
    pub fn property_key(self) -> &'static str {
        match self {
            Self::StoreFile => "storeFile",
            Self::StorePassword => "storePassword",
            Self::KeyAlias => "keyAlias",
            Self::KeyPassword => "keyPassword",
        }
    }

    /// Key used in the Keystead config file
    pub fn config_key(self) -> &'static str {
        match self {
            Self::StoreFile => "store_file",
            Self::StorePassword => "store_password",
            Self::KeyAlias => "key_alias",
            Self::KeyPassword => "key_password",
        }
    }

    /// Environment variable consulted when nothing else is configured
    pub fn default_env_var(self) -> &'static str {
        match self {
            Self::StoreFile => "STORE_FILE",
            Self::StorePassword => "STORE_PASSWORD",
            Self::KeyAlias => "KEY_ALIAS",
            Self::KeyPassword => "KEY_PASSWORD",
        }
    }

    /// Whether values of this field must never be printed
    pub fn is_secret(self) -> bool {
        matches!(self, Self::StorePassword | Self::KeyPassword)
    }

    /// Parse a Gradle/properties key (`storeFile`) or config key (`store_file`)
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.property_key() == key || f.config_key() == key)
    }
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreFile => write!(f, "store file"),
            Self::StorePassword => write!(f, "store password"),
            Self::KeyAlias => write!(f, "key alias"),
            Self::KeyPassword => write!(f, "key password"),
        }
    }
}

/// Where a single credential attribute may come from, in precedence order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSource {
    /// Environment variable name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    /// Key in the properties file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,

    /// Literal fallback value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl CredentialSource {
    /// Source backed by an environment variable
    pub fn env(name: impl Into<String>) -> Self {
        Self {
            env: Some(name.into()),
            ..Default::default()
        }
    }

    /// Source backed by a properties key
    pub fn property(key: impl Into<String>) -> Self {
        Self {
            property: Some(key.into()),
            ..Default::default()
        }
    }

    /// Add a properties-file fallback
    pub fn with_property(mut self, key: impl Into<String>) -> Self {
        self.property = Some(key.into());
        self
    }

    /// Add a literal fallback
    pub fn with_literal(mut self, value: impl Into<String>) -> Self {
        self.literal = Some(value.into());
        self
    }

    /// True when no source is configured at all
    pub fn is_empty(&self) -> bool {
        self.env.is_none() && self.property.is_none() && self.literal.is_none()
    }

    /// Conventional source for a field: default env var, then canonical property key
    pub fn conventional(field: CredentialField) -> Self {
        Self::env(field.default_env_var()).with_property(field.property_key())
    }
}

/// Credential sources for one build variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    /// Whether every attribute must resolve
    pub required: bool,

    /// Keystore file location
    pub store_file: CredentialSource,

    /// Keystore password
    pub store_password: CredentialSource,

    /// Key alias
    pub key_alias: CredentialSource,

    /// Key password
    pub key_password: CredentialSource,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            required: true,
            store_file: CredentialSource::conventional(CredentialField::StoreFile),
            store_password: CredentialSource::conventional(CredentialField::StorePassword),
            key_alias: CredentialSource::conventional(CredentialField::KeyAlias),
            key_password: CredentialSource::conventional(CredentialField::KeyPassword),
        }
    }
}

impl VariantConfig {
    /// Source for the given field
    pub fn source(&self, field: CredentialField) -> &CredentialSource {
        match field {
            CredentialField::StoreFile => &self.store_file,
            CredentialField::StorePassword => &self.store_password,
            CredentialField::KeyAlias => &self.key_alias,
            CredentialField::KeyPassword => &self.key_password,
        }
    }

    /// Mutable source for the given field
    pub fn source_mut(&mut self, field: CredentialField) -> &mut CredentialSource {
        match field {
            CredentialField::StoreFile => &mut self.store_file,
            CredentialField::StorePassword => &mut self.store_password,
            CredentialField::KeyAlias => &mut self.key_alias,
            CredentialField::KeyPassword => &mut self.key_password,
        }
    }
}

/// Resolution behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Refuse environment variable names that look like literal values
    pub strict_env_names: bool,
}

/// Severity of a lint diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    /// Informational
    Info,
    /// Probable problem
    Warning,
    /// Definite defect
    Error,
}

impl std::fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LintSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Lint configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// Treat warnings as errors
    pub strict: bool,

    /// Rule ids to skip
    pub disabled: Vec<String>,

    /// Severity overrides by rule id
    pub severity: BTreeMap<String, LintSeverity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_release_variant() {
        let config = Config::default();
        let release = config.variant(RELEASE_VARIANT).unwrap();
        assert!(release.required);
        assert_eq!(release.store_password.env.as_deref(), Some("STORE_PASSWORD"));
        assert_eq!(
            release.store_password.property.as_deref(),
            Some("storePassword")
        );
        assert_eq!(config.properties_file, PathBuf::from("key.properties"));
    }

    #[test]
    fn test_field_keys() {
        for field in CredentialField::ALL {
            assert_eq!(CredentialField::from_key(field.property_key()), Some(field));
            assert_eq!(CredentialField::from_key(field.config_key()), Some(field));
        }
        assert_eq!(CredentialField::from_key("storeType"), None);
        assert!(CredentialField::KeyPassword.is_secret());
        assert!(!CredentialField::KeyAlias.is_secret());
    }

    #[test]
    fn test_parse_toml_variant() {
        let config: Config = toml::from_str(
            r#"
properties_file = "android/key.properties"

[variants.release]
store_file = { env = "BITRISEIO_ANDROID_KEYSTORE_PATH" }
store_password = { env = "BITRISEIO_ANDROID_KEYSTORE_PASSWORD", property = "storePassword" }

[lint]
disabled = ["delegated-sdk-version"]
severity = { no-fallback = "error" }
"#,
        )
        .unwrap();

        let release = config.variant("release").unwrap();
        assert_eq!(
            release.store_file.env.as_deref(),
            Some("BITRISEIO_ANDROID_KEYSTORE_PATH")
        );
        assert!(release.store_file.property.is_none());
        // Omitted fields keep their conventional defaults
        assert_eq!(release.key_alias.env.as_deref(), Some("KEY_ALIAS"));
        assert_eq!(
            config.lint.severity.get("no-fallback"),
            Some(&LintSeverity::Error)
        );
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("warn".parse::<LintSeverity>(), Ok(LintSeverity::Warning));
        assert_eq!("ERROR".parse::<LintSeverity>(), Ok(LintSeverity::Error));
        assert!("fatal".parse::<LintSeverity>().is_err());
        assert!(LintSeverity::Error > LintSeverity::Warning);
    }
}
