//! Keystead Signing - Signing credential resolution
//!
//! This crate builds the Signing Credential Descriptor (keystore location,
//! store password, key alias, key password) for a build variant:
//! - Environment variables, then `key.properties` entries, then literal fallbacks
//! - Provenance for every resolved attribute
//! - A hard error naming every required attribute that stayed unresolved
//!
//! It also inspects keystore files on disk and, optionally, their entries
//! through `keytool`.

pub mod descriptor;
pub mod env;
pub mod error;
pub mod keystore;
pub mod keytool;
pub mod properties;
pub mod resolver;
pub mod secret;

pub use descriptor::{MissingField, Provenance, Resolved, SigningDescriptor};
pub use env::{Environment, MapEnvironment, ProcessEnvironment};
pub use error::{Result, SigningError};
pub use keystore::{KeystoreFile, KeystoreFormat};
pub use keytool::{KeystoreEntry, KeystoreInspector, KeytoolInspector};
pub use properties::Properties;
pub use resolver::{CredentialResolver, Resolution, ResolutionWarning};
pub use secret::Secret;

pub use keystead_core::config::{CredentialField, CredentialSource, VariantConfig};
