//! Credential resolution
//!
//! Each attribute is looked up in order: environment variable (when set and
//! non-empty), properties file entry (when present and non-empty), literal
//! fallback. A required variant with any attribute left over fails with
//! [`SigningError::MissingCredentials`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use keystead_core::config::{
    expand_home, is_valid_env_name, Config, CredentialField, CredentialSource, VariantConfig,
};

use crate::descriptor::{MissingField, Provenance, Resolved, SigningDescriptor};
use crate::env::Environment;
use crate::error::{Result, SigningError};
use crate::properties::Properties;
use crate::secret::Secret;

/// Something worth reporting that did not stop resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionWarning {
    /// The env entry is not an environment variable name
    SuspiciousEnvName { field: CredentialField, name: String },
    /// The environment variable is set but blank
    EmptyEnvVar { field: CredentialField, var: String },
    /// A properties fallback is configured but the file is absent
    PropertiesFileMissing { path: PathBuf },
    /// A password came from a literal in configuration
    LiteralSecret { field: CredentialField },
}

impl std::fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuspiciousEnvName { field, name } => write!(
                f,
                "{}: '{}' is not an environment variable name and will resolve to nothing",
                field, name
            ),
            Self::EmptyEnvVar { field, var } => {
                write!(f, "{}: environment variable {} is set but empty", field, var)
            }
            Self::PropertiesFileMissing { path } => {
                write!(f, "properties file {} does not exist", path.display())
            }
            Self::LiteralSecret { field } => {
                write!(f, "{}: value comes from a literal in configuration", field)
            }
        }
    }
}

/// Outcome of resolving one variant
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// The resolved descriptor
    pub descriptor: SigningDescriptor,
    /// Non-fatal findings
    pub warnings: Vec<ResolutionWarning>,
}

/// Resolves signing credential descriptors
pub struct CredentialResolver<'a> {
    env: &'a dyn Environment,
    project_root: PathBuf,
    properties: Option<(PathBuf, Properties)>,
    missing_properties: Option<PathBuf>,
    strict_env_names: bool,
}

impl<'a> CredentialResolver<'a> {
    /// Create a resolver reading from `env`
    ///
    /// Relative keystore paths resolve against `project_root`.
    pub fn new(env: &'a dyn Environment, project_root: impl Into<PathBuf>) -> Self {
        Self {
            env,
            project_root: project_root.into(),
            properties: None,
            missing_properties: None,
            strict_env_names: false,
        }
    }

    /// Create a resolver set up from a loaded configuration
    pub fn from_config(
        env: &'a dyn Environment,
        config: &Config,
        project_root: &Path,
    ) -> Result<Self> {
        let properties_path = project_root.join(expand_home(&config.properties_file));
        Ok(Self::new(env, project_root)
            .strict_env_names(config.resolution.strict_env_names)
            .with_properties_file(&properties_path)?)
    }

    /// Load the properties fallback file. A missing file is tolerated and reported.
    pub fn with_properties_file(mut self, path: &Path) -> Result<Self> {
        if path.is_file() {
            let properties = Properties::load(path)?;
            self.properties = Some((path.to_path_buf(), properties));
            self.missing_properties = None;
        } else {
            debug!(path = %path.display(), "properties file not found");
            self.properties = None;
            self.missing_properties = Some(path.to_path_buf());
        }
        Ok(self)
    }

    /// Use already-parsed properties
    pub fn with_properties(mut self, path: impl Into<PathBuf>, properties: Properties) -> Self {
        self.properties = Some((path.into(), properties));
        self.missing_properties = None;
        self
    }

    /// Refuse env entries that are not environment variable names
    pub fn strict_env_names(mut self, strict: bool) -> Self {
        self.strict_env_names = strict;
        self
    }

    /// Resolve a variant from configuration
    pub fn resolve_variant(&self, config: &Config, variant: &str) -> Result<Resolution> {
        let variant_config = config
            .variant(variant)
            .ok_or_else(|| SigningError::UnknownVariant(variant.to_string()))?;
        self.resolve(variant, variant_config)
    }

    /// Resolve all four attributes of a variant
    #[instrument(skip(self, config), fields(required = config.required))]
    pub fn resolve(&self, variant: &str, config: &VariantConfig) -> Result<Resolution> {
        let mut descriptor = SigningDescriptor::new(variant);
        let mut warnings = Vec::new();
        let mut missing = Vec::new();

        for field in CredentialField::ALL {
            let source = config.source(field);
            match self.lookup(field, source, &mut warnings)? {
                Some((value, provenance)) => {
                    debug!(%field, source = %provenance, "attribute resolved");
                    self.assign(&mut descriptor, field, value, provenance);
                }
                None => {
                    debug!(%field, "attribute unresolved");
                    missing.push(MissingField::new(field, self.describe_sources(source)));
                }
            }
        }

        if let Some(path) = &self.missing_properties {
            let uses_properties = CredentialField::ALL
                .iter()
                .any(|&f| config.source(f).property.is_some());
            if uses_properties {
                warnings.push(ResolutionWarning::PropertiesFileMissing { path: path.clone() });
            }
        }

        for warning in &warnings {
            warn!(variant, "{}", warning);
        }

        if config.required && !missing.is_empty() {
            return Err(SigningError::MissingCredentials {
                variant: variant.to_string(),
                missing,
            });
        }

        info!(
            variant,
            complete = descriptor.is_complete(),
            "signing credentials resolved"
        );
        Ok(Resolution {
            descriptor,
            warnings,
        })
    }

    fn lookup(
        &self,
        field: CredentialField,
        source: &CredentialSource,
        warnings: &mut Vec<ResolutionWarning>,
    ) -> Result<Option<(String, Provenance)>> {
        if let Some(name) = &source.env {
            if !is_valid_env_name(name) {
                if self.strict_env_names {
                    return Err(SigningError::SuspiciousEnvName {
                        field: field.to_string(),
                        name: name.clone(),
                    });
                }
                warnings.push(ResolutionWarning::SuspiciousEnvName {
                    field,
                    name: name.clone(),
                });
            }

            match self.env.var(name) {
                Some(value) if !value.trim().is_empty() => {
                    return Ok(Some((value, Provenance::Environment { var: name.clone() })));
                }
                Some(_) => warnings.push(ResolutionWarning::EmptyEnvVar {
                    field,
                    var: name.clone(),
                }),
                None => {}
            }
        }

        if let (Some(key), Some((path, properties))) = (&source.property, &self.properties) {
            if let Some(value) = properties.get(key).filter(|v| !v.trim().is_empty()) {
                return Ok(Some((
                    value.to_string(),
                    Provenance::Properties {
                        key: key.clone(),
                        file: path.clone(),
                    },
                )));
            }
        }

        if let Some(literal) = source.literal.as_ref().filter(|v| !v.is_empty()) {
            if field.is_secret() {
                warnings.push(ResolutionWarning::LiteralSecret { field });
            }
            return Ok(Some((literal.clone(), Provenance::Literal)));
        }

        Ok(None)
    }

    fn assign(
        &self,
        descriptor: &mut SigningDescriptor,
        field: CredentialField,
        value: String,
        provenance: Provenance,
    ) {
        match field {
            CredentialField::StoreFile => {
                let path = self.keystore_path(value.trim());
                descriptor.store_file = Some(Resolved::new(path, provenance));
            }
            CredentialField::StorePassword => {
                descriptor.store_password = Some(Resolved::new(Secret::from(value), provenance));
            }
            CredentialField::KeyAlias => {
                descriptor.key_alias = Some(Resolved::new(value, provenance));
            }
            CredentialField::KeyPassword => {
                descriptor.key_password = Some(Resolved::new(Secret::from(value), provenance));
            }
        }
    }

    /// Relative keystore paths resolve against the project root, as `rootProject.file` does
    fn keystore_path(&self, raw: &str) -> PathBuf {
        let path = expand_home(Path::new(raw));
        if path.is_absolute() {
            path
        } else {
            self.project_root.join(path)
        }
    }

    fn describe_sources(&self, source: &CredentialSource) -> Vec<String> {
        let mut tried = Vec::new();
        if let Some(name) = &source.env {
            tried.push(format!("env {}", name));
        }
        if let Some(key) = &source.property {
            match (&self.properties, &self.missing_properties) {
                (Some((path, _)), _) => tried.push(format!("{} in {}", key, path.display())),
                (None, Some(path)) => {
                    tried.push(format!("{} in {} (file not found)", key, path.display()))
                }
                (None, None) => tried.push(format!("{} (no properties file)", key)),
            }
        }
        if source.literal.is_some() {
            tried.push("literal (empty)".to_string());
        }
        tried
    }
}
