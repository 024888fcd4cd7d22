//! Exit codes for the CLI

use keystead_core::{ConfigError, KeysteadError};
use keystead_gradle::GradleError;
use keystead_signing::SigningError;

/// Success
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error, including signing credentials that do not resolve
pub const CONFIG_ERROR: i32 = 2;

/// Validation or lint failure
pub const VALIDATION_ERROR: i32 = 5;

/// Exit code for an error returned by a command
pub fn for_error(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return CONFIG_ERROR;
        }
        if let Some(e) = cause.downcast_ref::<KeysteadError>() {
            if e.is_config() {
                return CONFIG_ERROR;
            }
        }
        if let Some(e) = cause.downcast_ref::<SigningError>() {
            if is_config_failure(e) {
                return CONFIG_ERROR;
            }
        }
        if let Some(GradleError::UnknownRule(_)) = cause.downcast_ref::<GradleError>() {
            return CONFIG_ERROR;
        }
    }
    ERROR
}

fn is_config_failure(err: &SigningError) -> bool {
    matches!(
        err,
        SigningError::MissingCredentials { .. }
            | SigningError::SuspiciousEnvName { .. }
            | SigningError::UnknownVariant(_)
            | SigningError::KeystoreNotFound(_)
            | SigningError::KeystoreNotAFile(_)
            | SigningError::Properties { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystead_core::config::CredentialField;
    use keystead_signing::MissingField;

    #[test]
    fn test_missing_credentials_is_config_error() {
        let err = anyhow::Error::new(SigningError::MissingCredentials {
            variant: "release".to_string(),
            missing: vec![MissingField::new(CredentialField::StorePassword, vec![])],
        });
        assert_eq!(for_error(&err), CONFIG_ERROR);
    }

    #[test]
    fn test_context_is_looked_through() {
        let err = anyhow::Error::new(ConfigError::MissingField("variants".to_string()))
            .context("loading keystead.toml");
        assert_eq!(for_error(&err), CONFIG_ERROR);
    }

    #[test]
    fn test_other_errors() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(for_error(&err), ERROR);

        let err = anyhow::Error::new(SigningError::ToolNotFound {
            tool: "keytool".to_string(),
            hint: String::new(),
        });
        assert_eq!(for_error(&err), ERROR);
    }

    #[test]
    fn test_keystore_failures_split_by_cause() {
        let err = anyhow::Error::new(SigningError::KeystoreNotFound("/keys/upload.jks".into()));
        assert_eq!(for_error(&err), CONFIG_ERROR);

        let err = anyhow::Error::new(SigningError::IncorrectPassword("/keys/upload.jks".into()));
        assert_eq!(for_error(&err), ERROR);

        let err = anyhow::Error::new(SigningError::ToolFailed {
            tool: "keytool".to_string(),
            reason: "exit status 1".to_string(),
        });
        assert_eq!(for_error(&err), ERROR);
    }
}
