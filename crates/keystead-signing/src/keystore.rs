//! Keystore file inspection

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, SigningError};

/// Container format, sniffed from the leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeystoreFormat {
    /// Java KeyStore
    Jks,
    /// Java Cryptography Extension KeyStore
    Jceks,
    /// PKCS#12 (DER)
    Pkcs12,
    /// Anything else
    Unknown,
}

impl KeystoreFormat {
    /// Detect the format from the first bytes of a file
    pub fn sniff(header: &[u8]) -> Self {
        match header {
            [0xFE, 0xED, 0xFE, 0xED, ..] => Self::Jks,
            [0xCE, 0xCE, 0xCE, 0xCE, ..] => Self::Jceks,
            [0x30, ..] => Self::Pkcs12,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for KeystoreFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jks => write!(f, "JKS"),
            Self::Jceks => write!(f, "JCEKS"),
            Self::Pkcs12 => write!(f, "PKCS#12"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A keystore file on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeystoreFile {
    /// Location
    pub path: PathBuf,
    /// Detected format
    pub format: KeystoreFormat,
    /// Size in bytes
    pub size: u64,
    /// SHA-256 of the file contents, hex encoded
    pub sha256: String,
}

impl KeystoreFile {
    /// Check that a keystore exists, is a non-empty file, and fingerprint it
    pub fn inspect(path: &Path) -> Result<Self> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SigningError::KeystoreNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(SigningError::KeystoreNotAFile(path.to_path_buf()));
        }

        if metadata.len() == 0 {
            return Err(SigningError::InvalidKeystore {
                path: path.to_path_buf(),
                reason: "file is empty".to_string(),
            });
        }

        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut header = Vec::with_capacity(4);
        let mut buffer = [0u8; 8192];

        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            if header.len() < 4 {
                let take = (4 - header.len()).min(read);
                header.extend_from_slice(&buffer[..take]);
            }
            hasher.update(&buffer[..read]);
        }

        let format = KeystoreFormat::sniff(&header);
        let sha256 = hex::encode_upper(hasher.finalize());
        debug!(path = %path.display(), %format, size = metadata.len(), "inspected keystore");

        Ok(Self {
            path: path.to_path_buf(),
            format,
            size: metadata.len(),
            sha256,
        })
    }

    /// Whether the format was recognised
    pub fn is_recognized(&self) -> bool {
        self.format != KeystoreFormat::Unknown
    }
}
