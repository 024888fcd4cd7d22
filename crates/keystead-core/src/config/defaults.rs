//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "keystead.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "keystead.yaml";

/// Subdirectory also searched at every level (Flutter projects keep Gradle under it)
pub const ANDROID_DIR: &str = "android";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".keystead.toml",
        ".keystead.yaml",
    ]
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Keystead Configuration
#
# Each attribute is looked up in order: environment variable, then the
# properties file, then the literal fallback. Anything still unresolved
# for a required variant is a hard error.

properties_file: key.properties

variants:
  release:
    required: true
    store_file:
      env: STORE_FILE
      property: storeFile
    store_password:
      env: STORE_PASSWORD
      property: storePassword
    key_alias:
      env: KEY_ALIAS
      property: keyAlias
    key_password:
      env: KEY_PASSWORD
      property: keyPassword

resolution:
  strict_env_names: false

lint:
  disabled: []
  severity: {}
  strict: false
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_template_matches_defaults() {
        let parsed: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        let default = Config::default();
        assert_eq!(parsed.variants, default.variants);
        assert_eq!(parsed.properties_file, default.properties_file);
        assert_eq!(parsed.lint, default.lint);
    }
}
