//! Project context shared by commands

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use keystead_core::config::{expand_home, load_config_or_default, project_root, Config};
use keystead_gradle::BuildScript;
use keystead_signing::{CredentialResolver, Environment, Resolution, SigningError};

/// Files that mark the root of a Gradle build
const SETTINGS_FILES: [&str; 2] = ["settings.gradle.kts", "settings.gradle"];

/// Loaded configuration and the directories it applies to
#[derive(Debug)]
pub struct ProjectContext {
    /// Working directory the command runs in
    pub cwd: PathBuf,
    /// Loaded configuration, or defaults
    pub config: Config,
    /// Config file the configuration came from
    pub config_path: Option<PathBuf>,
    /// Gradle root project directory
    pub project_root: PathBuf,
}

/// What to resolve and from where
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    /// Build variant
    pub variant: String,
    /// Read credential sources from this build script instead of configuration
    pub from_gradle: Option<PathBuf>,
    /// Override the properties file
    pub properties: Option<PathBuf>,
    /// Refuse env entries that are not variable names
    pub strict_env_names: bool,
}

impl ProjectContext {
    /// Load configuration for the current working directory
    pub fn load() -> anyhow::Result<Self> {
        Self::discover(&std::env::current_dir()?)
    }

    /// Load configuration found at or above `cwd`
    pub fn discover(cwd: &Path) -> anyhow::Result<Self> {
        let (config, config_path) = load_config_or_default(cwd)?;
        let project_root = project_root(&config, config_path.as_deref(), cwd);
        debug!(
            config = ?config_path,
            project_root = %project_root.display(),
            "project context loaded"
        );

        Ok(Self {
            cwd: cwd.to_path_buf(),
            config,
            config_path,
            project_root,
        })
    }

    /// Absolute form of a path given on the command line
    pub fn absolute(&self, path: &Path) -> PathBuf {
        self.cwd.join(expand_home(path))
    }

    /// Resolve the signing credentials a request describes
    pub fn resolve(&self, env: &dyn Environment, request: &ResolveRequest) -> anyhow::Result<Resolution> {
        let strict = request.strict_env_names || self.config.resolution.strict_env_names;

        if let Some(script) = &request.from_gradle {
            return self.resolve_from_gradle(env, request, &self.absolute(script), strict);
        }

        let mut resolver = CredentialResolver::from_config(env, &self.config, &self.project_root)?
            .strict_env_names(strict);
        if let Some(properties) = &request.properties {
            resolver = resolver.with_properties_file(&self.absolute(properties))?;
        }

        Ok(resolver.resolve_variant(&self.config, &request.variant)?)
    }

    fn resolve_from_gradle(
        &self,
        env: &dyn Environment,
        request: &ResolveRequest,
        script_path: &Path,
        strict: bool,
    ) -> anyhow::Result<Resolution> {
        let script = BuildScript::load(script_path)
            .with_context(|| format!("reading {}", script_path.display()))?;
        let block = script
            .signing_config_for(&request.variant)
            .or_else(|| script.signing_config(&request.variant))
            .ok_or_else(|| SigningError::UnknownVariant(request.variant.clone()))?;

        let module_dir = script_path.parent().unwrap_or(self.cwd.as_path()).to_path_buf();
        info!(
            script = %script_path.display(),
            signing_config = %block.name,
            "resolving from build script"
        );

        let mut resolver = CredentialResolver::new(env, &module_dir).strict_env_names(strict);

        let properties_file = match &request.properties {
            Some(path) => Some(self.absolute(path)),
            None => block
                .fields
                .values()
                .flat_map(|assignment| assignment.expr.properties())
                .find_map(|(object, _)| script.properties_file_for(object))
                .map(|file| gradle_root(&module_dir).join(file)),
        };
        if let Some(path) = properties_file {
            resolver = resolver.with_properties_file(&path)?;
        }

        Ok(resolver.resolve(&request.variant, &block.to_variant_config())?)
    }
}

/// Nearest directory at or above `module_dir` holding a settings script
pub fn gradle_root(module_dir: &Path) -> PathBuf {
    module_dir
        .ancestors()
        .find(|dir| SETTINGS_FILES.iter().any(|name| dir.join(name).is_file()))
        .unwrap_or(module_dir)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystead_core::config::CredentialField;
    use keystead_signing::{MapEnvironment, Provenance};
    use tempfile::TempDir;

    const APP_SCRIPT: &str = r#"import java.util.Properties
import java.io.FileInputStream
plugins {
    id("com.android.application")
}
val keystoreProperties = Properties()
val keystorePropertiesFile = rootProject.file("key.properties")
if (keystorePropertiesFile.exists()) {
    keystoreProperties.load(FileInputStream(keystorePropertiesFile))
}
android {
    namespace = "com.example.app"
    signingConfigs {
        create("release") {
            keyAlias = System.getenv("BITRISEIO_ANDROID_KEYSTORE_ALIAS") ?: keystoreProperties["keyAlias"] as String?
            keyPassword = System.getenv("BITRISEIO_ANDROID_KEYSTORE_PRIVATE_KEY_PASSWORD") ?: keystoreProperties["keyPassword"] as String?
            storeFile = System.getenv("BITRISEIO_ANDROID_KEYSTORE_PATH")?.let { file(it) }
            storePassword = System.getenv("BITRISEIO_ANDROID_KEYSTORE_PASSWORD") ?: keystoreProperties["storePassword"] as String?
        }
    }
    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("release")
        }
    }
}
"#;

    fn request(variant: &str) -> ResolveRequest {
        ResolveRequest {
            variant: variant.to_string(),
            ..Default::default()
        }
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_defaults_without_config() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::discover(temp.path()).unwrap();
        assert!(ctx.config_path.is_none());
        assert_eq!(ctx.project_root, temp.path());
        assert!(ctx.config.variant("release").is_some());
    }

    #[test]
    fn test_env_wins_without_properties_file() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::discover(temp.path()).unwrap();
        let env = MapEnvironment::new()
            .with("STORE_FILE", "upload.jks")
            .with("STORE_PASSWORD", "abc123")
            .with("KEY_ALIAS", "upload")
            .with("KEY_PASSWORD", "def456");

        let resolution = ctx.resolve(&env, &request("release")).unwrap();
        let descriptor = &resolution.descriptor;
        assert_eq!(descriptor.store_password().unwrap().expose(), "abc123");
        assert_eq!(descriptor.store_file().unwrap(), temp.path().join("upload.jks"));
        assert!(descriptor.is_complete());
    }

    #[test]
    fn test_properties_fallback_with_config_project_root() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "keystead.toml", "project_root = \"android\"\n");
        write(
            temp.path(),
            "android/key.properties",
            "storeFile=upload.jks\nstorePassword=xyz\nkeyAlias=upload\nkeyPassword=xyz\n",
        );

        let ctx = ProjectContext::discover(temp.path()).unwrap();
        assert_eq!(ctx.project_root, temp.path().join("android"));

        let resolution = ctx.resolve(&MapEnvironment::new(), &request("release")).unwrap();
        assert_eq!(resolution.descriptor.store_password().unwrap().expose(), "xyz");
        assert_eq!(
            resolution.descriptor.store_file().unwrap(),
            temp.path().join("android/upload.jks")
        );
    }

    #[test]
    fn test_all_unset_is_missing_credentials() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::discover(temp.path()).unwrap();

        let err = ctx.resolve(&MapEnvironment::new(), &request("release")).unwrap_err();
        match err.downcast_ref::<SigningError>() {
            Some(SigningError::MissingCredentials { missing, .. }) => assert_eq!(missing.len(), 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_properties_override() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "ci/signing.properties",
            "storeFile=/keys/upload.jks\nstorePassword=ci\nkeyAlias=upload\nkeyPassword=ci\n",
        );
        let ctx = ProjectContext::discover(temp.path()).unwrap();
        let req = ResolveRequest {
            properties: Some(PathBuf::from("ci/signing.properties")),
            ..request("release")
        };

        let resolution = ctx.resolve(&MapEnvironment::new(), &req).unwrap();
        assert_eq!(resolution.descriptor.key_alias(), Some("upload"));
        assert_eq!(
            resolution.descriptor.store_file().unwrap(),
            Path::new("/keys/upload.jks")
        );
    }

    #[test]
    fn test_unknown_variant() {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::discover(temp.path()).unwrap();
        let err = ctx.resolve(&MapEnvironment::new(), &request("staging")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SigningError>(),
            Some(SigningError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_from_gradle_mixes_env_and_root_properties() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "android/settings.gradle.kts", "include(\":app\")\n");
        write(
            temp.path(),
            "android/key.properties",
            "keyAlias=upload\nkeyPassword=from-file\nstorePassword=from-file\n",
        );
        write(temp.path(), "android/app/build.gradle.kts", APP_SCRIPT);

        let ctx = ProjectContext::discover(temp.path()).unwrap();
        let env = MapEnvironment::new()
            .with("BITRISEIO_ANDROID_KEYSTORE_PATH", "upload.jks")
            .with("BITRISEIO_ANDROID_KEYSTORE_PASSWORD", "abc123");
        let req = ResolveRequest {
            from_gradle: Some(PathBuf::from("android/app/build.gradle.kts")),
            ..request("release")
        };

        let resolution = ctx.resolve(&env, &req).unwrap();
        let descriptor = &resolution.descriptor;
        assert_eq!(
            descriptor.store_file().unwrap(),
            temp.path().join("android/app/upload.jks")
        );
        assert_eq!(descriptor.store_password().unwrap().expose(), "abc123");
        assert_eq!(descriptor.key_password().unwrap().expose(), "from-file");
        assert!(matches!(
            descriptor.provenance(CredentialField::KeyAlias),
            Some(Provenance::Properties { key, .. }) if key == "keyAlias"
        ));
    }

    #[test]
    fn test_from_gradle_missing_store_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "android/settings.gradle.kts", "");
        write(temp.path(), "android/app/build.gradle.kts", APP_SCRIPT);

        let ctx = ProjectContext::discover(temp.path()).unwrap();
        let req = ResolveRequest {
            from_gradle: Some(PathBuf::from("android/app/build.gradle.kts")),
            ..request("release")
        };

        let err = ctx.resolve(&MapEnvironment::new(), &req).unwrap_err();
        match err.downcast_ref::<SigningError>() {
            Some(SigningError::MissingCredentials { missing, .. }) => {
                assert!(missing.iter().any(|m| m.field == CredentialField::StoreFile));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_gradle_root() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "android/settings.gradle", "");
        std::fs::create_dir_all(temp.path().join("android/app")).unwrap();

        assert_eq!(gradle_root(&temp.path().join("android/app")), temp.path().join("android"));

        let lone = temp.path().join("lone");
        std::fs::create_dir_all(&lone).unwrap();
        assert_eq!(gradle_root(&lone), lone);
    }
}
