//! Keystore entry inspection using keytool

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SigningError};
use crate::secret::Secret;

/// Variable used to hand the store password to keytool without putting it in argv
const STOREPASS_ENV: &str = "KEYSTEAD_KEYTOOL_STOREPASS";

/// An entry listed in a keystore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeystoreEntry {
    /// Alias name
    pub alias: String,
    /// Entry type (e.g. `PrivateKeyEntry`)
    pub entry_type: Option<String>,
    /// Certificate owner DN
    pub owner: Option<String>,
    /// SHA-256 certificate fingerprint, without separators
    pub sha256: Option<String>,
}

impl KeystoreEntry {
    fn new(alias: String) -> Self {
        Self {
            alias,
            entry_type: None,
            owner: None,
            sha256: None,
        }
    }
}

/// Lists entries of a keystore
#[async_trait::async_trait]
pub trait KeystoreInspector: Send + Sync {
    /// Name of this inspector
    fn name(&self) -> &str;

    /// Check if the inspector can run on this system
    fn is_available(&self) -> bool;

    /// List the entries of a keystore
    async fn list_entries(&self, keystore: &Path, store_password: &Secret) -> Result<Vec<KeystoreEntry>>;

    /// Find an alias in a keystore. Aliases compare case-insensitively, as keytool lowercases JKS aliases.
    async fn find_alias(
        &self,
        keystore: &Path,
        store_password: &Secret,
        alias: &str,
    ) -> Result<KeystoreEntry> {
        let entries = self.list_entries(keystore, store_password).await?;
        let available: Vec<String> = entries.iter().map(|e| e.alias.clone()).collect();

        entries
            .into_iter()
            .find(|e| e.alias.eq_ignore_ascii_case(alias))
            .ok_or_else(|| SigningError::AliasNotFound {
                alias: alias.to_string(),
                keystore: keystore.to_path_buf(),
                available,
            })
    }
}

/// Inspector backed by the JDK's keytool
pub struct KeytoolInspector {
    keytool_path: Option<PathBuf>,
}

impl KeytoolInspector {
    /// Create an inspector, locating keytool on PATH or under JAVA_HOME
    pub fn new() -> Self {
        Self {
            keytool_path: Self::find_keytool(),
        }
    }

    /// Use an explicit keytool binary
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            keytool_path: Some(path.into()),
        }
    }

    fn find_keytool() -> Option<PathBuf> {
        if let Ok(path) = which::which("keytool") {
            return Some(path);
        }

        let java_home = std::env::var_os("JAVA_HOME")?;
        let name = if cfg!(windows) { "keytool.exe" } else { "keytool" };
        let candidate = Path::new(&java_home).join("bin").join(name);
        candidate.is_file().then_some(candidate)
    }

    fn get_keytool(&self) -> Result<&Path> {
        self.keytool_path.as_deref().ok_or_else(|| SigningError::ToolNotFound {
            tool: "keytool".to_string(),
            hint: "Install a JDK or set JAVA_HOME".to_string(),
        })
    }

    /// Parse `keytool -list -v` output
    pub fn parse_list_output(output: &str) -> Vec<KeystoreEntry> {
        let mut entries = Vec::new();
        let mut current: Option<KeystoreEntry> = None;

        for line in output.lines() {
            let line = line.trim();

            if let Some(alias) = line.strip_prefix("Alias name:") {
                if let Some(entry) = current.take() {
                    entries.push(entry);
                }
                current = Some(KeystoreEntry::new(alias.trim().to_string()));
                continue;
            }

            let Some(entry) = current.as_mut() else {
                continue;
            };

            if let Some(entry_type) = line.strip_prefix("Entry type:") {
                entry.entry_type = Some(entry_type.trim().to_string());
            } else if let Some(owner) = line.strip_prefix("Owner:") {
                // Only the first certificate of the chain describes the key
                if entry.owner.is_none() {
                    entry.owner = Some(owner.trim().to_string());
                }
            } else if let Some(fingerprint) = line.strip_prefix("SHA256:") {
                if entry.sha256.is_none() {
                    entry.sha256 = Some(fingerprint.trim().replace(':', ""));
                }
            }
        }

        if let Some(entry) = current {
            entries.push(entry);
        }

        entries
    }
}

impl Default for KeytoolInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl KeystoreInspector for KeytoolInspector {
    fn name(&self) -> &str {
        "keytool"
    }

    fn is_available(&self) -> bool {
        self.keytool_path.is_some()
    }

    async fn list_entries(&self, keystore: &Path, store_password: &Secret) -> Result<Vec<KeystoreEntry>> {
        let keytool = self.get_keytool()?;

        if !keystore.is_file() {
            return Err(SigningError::KeystoreNotFound(keystore.to_path_buf()));
        }

        debug!(keystore = %keystore.display(), "listing keystore entries with keytool");

        let output = Command::new(keytool)
            .arg("-list")
            .arg("-v")
            .arg("-keystore")
            .arg(keystore)
            .arg("-storepass:env")
            .arg(STOREPASS_ENV)
            .env(STOREPASS_ENV, store_password.expose())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = format!("{}\n{}", stdout, stderr);
            if combined.contains("password was incorrect") || combined.contains("Keystore was tampered with") {
                return Err(SigningError::IncorrectPassword(keystore.to_path_buf()));
            }
            return Err(SigningError::ToolFailed {
                tool: "keytool".to_string(),
                reason: combined.trim().to_string(),
            });
        }

        let entries = Self::parse_list_output(&stdout);
        info!(keystore = %keystore.display(), entries = entries.len(), "listed keystore entries");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_OUTPUT: &str = r#"
Keystore type: PKCS12
Keystore provider: SUN

Your keystore contains 2 entries

Alias name: upload
Creation date: Jan 1, 2024
Entry type: PrivateKeyEntry
Certificate chain length: 1
Certificate[1]:
Owner: CN=Darvin, O=Example
Issuer: CN=Darvin, O=Example
Serial number: 12345678
Valid from: Mon Jan 01 00:00:00 UTC 2024 until: Fri Jan 01 00:00:00 UTC 2054
Certificate fingerprints:
	 SHA1: AA:BB:CC:DD:EE:FF:00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD
	 SHA256: 11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF:00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF:00

*******************************************

Alias name: legacy
Creation date: Jan 1, 2020
Entry type: trustedCertEntry

Owner: CN=Legacy
"#;

    struct FixedInspector(Vec<KeystoreEntry>);

    #[async_trait::async_trait]
    impl KeystoreInspector for FixedInspector {
        fn name(&self) -> &str {
            "fixed"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn list_entries(&self, _keystore: &Path, _password: &Secret) -> Result<Vec<KeystoreEntry>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_parse_list_output() {
        let entries = KeytoolInspector::parse_list_output(LIST_OUTPUT);
        assert_eq!(entries.len(), 2);

        let upload = &entries[0];
        assert_eq!(upload.alias, "upload");
        assert_eq!(upload.entry_type.as_deref(), Some("PrivateKeyEntry"));
        assert_eq!(upload.owner.as_deref(), Some("CN=Darvin, O=Example"));
        assert_eq!(
            upload.sha256.as_deref(),
            Some("112233445566778899AABBCCDDEEFF00112233445566778899AABBCCDDEEFF00")
        );

        let legacy = &entries[1];
        assert_eq!(legacy.alias, "legacy");
        assert_eq!(legacy.sha256, None);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(KeytoolInspector::parse_list_output("Your keystore contains 0 entries").is_empty());
    }

    #[test]
    fn test_missing_keytool_is_reported() {
        let inspector = KeytoolInspector { keytool_path: None };
        assert!(!inspector.is_available());
        assert!(matches!(
            inspector.get_keytool().unwrap_err(),
            SigningError::ToolNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_find_alias_case_insensitive() {
        let inspector = FixedInspector(KeytoolInspector::parse_list_output(LIST_OUTPUT));
        let entry = inspector
            .find_alias(Path::new("/k.jks"), &Secret::new("pw"), "UPLOAD")
            .await
            .unwrap();
        assert_eq!(entry.alias, "upload");
    }

    #[tokio::test]
    async fn test_find_alias_missing_lists_available() {
        let inspector = FixedInspector(KeytoolInspector::parse_list_output(LIST_OUTPUT));
        let err = inspector
            .find_alias(Path::new("/k.jks"), &Secret::new("pw"), "release")
            .await
            .unwrap_err();
        match err {
            SigningError::AliasNotFound { available, .. } => {
                assert_eq!(available, vec!["upload".to_string(), "legacy".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
