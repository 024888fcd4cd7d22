//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::defaults::{config_file_names, ANDROID_DIR};
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// At each directory level the search checks:
///   1. `<dir>/<name>`          (e.g. `keystead.toml`)
///   2. `<dir>/android/<name>`  (e.g. `android/keystead.toml`)
///
/// The first match wins. Parents are walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.is_file() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }

            let android_path = current.join(ANDROID_DIR).join(name);
            if android_path.is_file() {
                info!(path = %android_path.display(), "found config file in android/");
                return Some(android_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration or use defaults.
///
/// Only a missing file falls back to defaults; a file that exists but fails
/// to parse or validate is still an error.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            info!(dir = %dir.display(), "no config found, using defaults");
            Ok((Config::default(), None))
        }
    }
}

/// Gradle root project directory for a loaded configuration.
///
/// `project_root` is taken relative to the config file's directory. Without
/// a config file the working directory is used.
pub fn project_root(config: &Config, config_path: Option<&Path>, cwd: &Path) -> PathBuf {
    let base = config_path
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf());

    match &config.project_root {
        Some(root) if root.is_absolute() => root.clone(),
        Some(root) => base.join(root),
        None => base,
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL_TOML: &str = "properties_file = \"key.properties\"\n";

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("keystead.toml");
        std::fs::write(&config_path, MINIMAL_TOML).unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_toml_over_yaml() {
        let temp = TempDir::new().unwrap();
        let toml_path = temp.path().join("keystead.toml");
        let yaml_path = temp.path().join("keystead.yaml");
        std::fs::write(&toml_path, MINIMAL_TOML).unwrap();
        std::fs::write(&yaml_path, "properties_file: key.properties\n").unwrap();

        let found = find_config(temp.path()).unwrap();
        assert_eq!(found, toml_path);
    }

    #[test]
    fn test_find_config_in_android_dir() {
        let temp = TempDir::new().unwrap();
        let android_dir = temp.path().join("android");
        std::fs::create_dir_all(&android_dir).unwrap();
        let config_path = android_dir.join("keystead.toml");
        std::fs::write(&config_path, MINIMAL_TOML).unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_walks_parents() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("keystead.yaml");
        std::fs::write(&config_path, "properties_file: key.properties\n").unwrap();
        let nested = temp.path().join("android").join("app");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config(&nested).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("keystead.yaml");
        std::fs::write(
            &config_path,
            "variants:\n  release:\n    store_password:\n      env: CI_STORE_PASSWORD\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        let release = config.variant("release").unwrap();
        assert_eq!(release.store_password.env.as_deref(), Some("CI_STORE_PASSWORD"));
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert!(config.variant("release").is_some());
    }

    #[test]
    fn test_load_config_or_default_propagates_parse_errors() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("keystead.toml"), "variants = 3\n").unwrap();
        assert!(load_config_or_default(temp.path()).is_err());
    }

    #[test]
    fn test_project_root_relative_to_config() {
        let mut config = Config::default();
        let config_path = Path::new("/work/app/keystead.toml");
        let cwd = Path::new("/elsewhere");

        assert_eq!(
            project_root(&config, Some(config_path), cwd),
            PathBuf::from("/work/app")
        );

        config.project_root = Some(PathBuf::from("android"));
        assert_eq!(
            project_root(&config, Some(config_path), cwd),
            PathBuf::from("/work/app/android")
        );

        assert_eq!(project_root(&config, None, cwd), PathBuf::from("/elsewhere/android"));
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(
            expand_home(Path::new("keys/upload.jks")),
            PathBuf::from("keys/upload.jks")
        );
    }
}
