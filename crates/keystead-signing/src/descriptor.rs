//! Signing credential descriptor

use std::path::{Path, PathBuf};

use serde::Serialize;

use keystead_core::config::CredentialField;

use crate::secret::{Secret, REDACTED};

/// Which source produced a resolved value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// Read from an environment variable
    Environment { var: String },
    /// Read from a properties file
    Properties { key: String, file: PathBuf },
    /// Literal fallback from configuration
    Literal,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment { var } => write!(f, "env {}", var),
            Self::Properties { key, file } => write!(f, "{} in {}", key, file.display()),
            Self::Literal => write!(f, "literal"),
        }
    }
}

/// A value together with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved<T> {
    /// The value
    pub value: T,
    /// Where it came from
    pub provenance: Provenance,
}

impl<T> Resolved<T> {
    /// Pair a value with its provenance
    pub fn new(value: T, provenance: Provenance) -> Self {
        Self { value, provenance }
    }
}

/// A required attribute that no source produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingField {
    /// The attribute
    pub field: CredentialField,
    /// Human-readable list of the sources that were consulted
    pub tried: Vec<String>,
}

impl MissingField {
    /// Describe a missing attribute
    pub fn new(field: CredentialField, tried: Vec<String>) -> Self {
        Self { field, tried }
    }
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.tried.is_empty() {
            write!(f, "{} (no sources configured)", self.field)
        } else {
            write!(f, "{} (tried: {})", self.field, self.tried.join(", "))
        }
    }
}

/// The quadruple needed to sign a build variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningDescriptor {
    /// Build variant name
    pub variant: String,

    /// Keystore file location, absolute
    pub store_file: Option<Resolved<PathBuf>>,

    /// Keystore password
    pub store_password: Option<Resolved<Secret>>,

    /// Key alias
    pub key_alias: Option<Resolved<String>>,

    /// Key password
    pub key_password: Option<Resolved<Secret>>,
}

impl SigningDescriptor {
    /// An empty descriptor for a variant
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            store_file: None,
            store_password: None,
            key_alias: None,
            key_password: None,
        }
    }

    /// Keystore path, if resolved
    pub fn store_file(&self) -> Option<&Path> {
        self.store_file.as_ref().map(|r| r.value.as_path())
    }

    /// Store password, if resolved
    pub fn store_password(&self) -> Option<&Secret> {
        self.store_password.as_ref().map(|r| &r.value)
    }

    /// Key alias, if resolved
    pub fn key_alias(&self) -> Option<&str> {
        self.key_alias.as_ref().map(|r| r.value.as_str())
    }

    /// Key password, if resolved
    pub fn key_password(&self) -> Option<&Secret> {
        self.key_password.as_ref().map(|r| &r.value)
    }

    /// Whether the field has a value
    pub fn is_resolved(&self, field: CredentialField) -> bool {
        self.provenance(field).is_some()
    }

    /// Whether all four attributes resolved
    pub fn is_complete(&self) -> bool {
        CredentialField::ALL.iter().all(|&f| self.is_resolved(f))
    }

    /// Attributes without a value
    pub fn unresolved(&self) -> Vec<CredentialField> {
        CredentialField::ALL
            .into_iter()
            .filter(|&f| !self.is_resolved(f))
            .collect()
    }

    /// Where a field's value came from
    pub fn provenance(&self, field: CredentialField) -> Option<&Provenance> {
        match field {
            CredentialField::StoreFile => self.store_file.as_ref().map(|r| &r.provenance),
            CredentialField::StorePassword => self.store_password.as_ref().map(|r| &r.provenance),
            CredentialField::KeyAlias => self.key_alias.as_ref().map(|r| &r.provenance),
            CredentialField::KeyPassword => self.key_password.as_ref().map(|r| &r.provenance),
        }
    }

    /// Printable value for a field; secrets are redacted unless `reveal`
    pub fn display_value(&self, field: CredentialField, reveal: bool) -> Option<String> {
        let secret = |s: &Secret| {
            if reveal {
                s.expose().to_string()
            } else {
                REDACTED.to_string()
            }
        };

        match field {
            CredentialField::StoreFile => self.store_file().map(|p| p.display().to_string()),
            CredentialField::StorePassword => self.store_password().map(secret),
            CredentialField::KeyAlias => self.key_alias().map(str::to_string),
            CredentialField::KeyPassword => self.key_password().map(secret),
        }
    }

    /// Raw string value for a field, secrets included
    pub fn expose_value(&self, field: CredentialField) -> Option<String> {
        self.display_value(field, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(var: &str) -> Provenance {
        Provenance::Environment {
            var: var.to_string(),
        }
    }

    #[test]
    fn test_empty_descriptor() {
        let descriptor = SigningDescriptor::new("release");
        assert!(!descriptor.is_complete());
        assert_eq!(descriptor.unresolved(), CredentialField::ALL.to_vec());
    }

    #[test]
    fn test_display_value_redacts_secrets() {
        let mut descriptor = SigningDescriptor::new("release");
        descriptor.store_password =
            Some(Resolved::new(Secret::new("abc123"), env("STORE_PASSWORD")));
        descriptor.key_alias = Some(Resolved::new("upload".to_string(), Provenance::Literal));

        assert_eq!(
            descriptor.display_value(CredentialField::StorePassword, false).as_deref(),
            Some(REDACTED)
        );
        assert_eq!(
            descriptor.display_value(CredentialField::StorePassword, true).as_deref(),
            Some("abc123")
        );
        assert_eq!(
            descriptor.display_value(CredentialField::KeyAlias, false).as_deref(),
            Some("upload")
        );
        assert_eq!(
            descriptor.unresolved(),
            vec![CredentialField::StoreFile, CredentialField::KeyPassword]
        );
    }

    #[test]
    fn test_serialized_descriptor_never_contains_secret() {
        let mut descriptor = SigningDescriptor::new("release");
        descriptor.key_password = Some(Resolved::new(Secret::new("hunter2"), Provenance::Literal));

        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"source\":\"literal\""));
    }

    #[test]
    fn test_provenance_display() {
        assert_eq!(env("KEY_ALIAS").to_string(), "env KEY_ALIAS");
        let props = Provenance::Properties {
            key: "keyAlias".to_string(),
            file: PathBuf::from("android/key.properties"),
        };
        assert_eq!(props.to_string(), "keyAlias in android/key.properties");
    }
}
