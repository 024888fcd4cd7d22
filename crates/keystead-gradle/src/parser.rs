//! Reading build scripts into a [`BuildScript`]

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, instrument};

use keystead_core::config::CredentialField;

use crate::error::{GradleError, Result};
use crate::expr::{string_literal, SourceExpr};
use crate::model::{
    BuildScript, BuildTypeBlock, ConfigValue, Dsl, EnvLookup, FieldAssignment, PropertiesLoad,
    PropertiesObject, Setting, SigningConfigBlock, SigningRef, SigningRefAt,
};
use crate::script::Source;

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^(?:val|var|def)\s+([A-Za-z_]\w*)(?:\s*:\s*[\w.<>?]+)?\s*=\s*(.+)$")
            .expect("Invalid regex")
    })
}

fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^([A-Za-z_][\w.]*)\s*(?:=\s*([^=].*)|\((.+)\)|\s(.+))$").expect("Invalid regex")
    })
}

fn properties_ctor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:new\s+)?(?:java\.util\.)?Properties\(\)").expect("Invalid regex"))
}

fn load_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Za-z_]\w*)\s*\.\s*load\s*\(").expect("Invalid regex"))
}

fn input_stream_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"FileInputStream\(\s*([^()]*(?:\([^()]*\))?)\s*\)|((?:rootProject\.|project\.)?file\(\s*["'][^"']+["']\s*\)|\b[A-Za-z_]\w*)\s*\.\s*(?:inputStream|newDataInputStream|reader|newReader|bufferedReader|withInputStream|withReader)\b"#,
        )
        .expect("Invalid regex")
    })
}

fn block_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?:(?:create|getByName|register|named|maybeCreate|findByName)\(\s*["']([^"']+)["']\s*\)|([A-Za-z_]\w*))$"#,
        )
        .expect("Invalid regex")
    })
}

fn signing_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^signingConfigs(?:\.(?:getByName|findByName|named|getAt)\(\s*["']([^"']+)["']\s*\)(?:\.get\(\))?|\[\s*["']([^"']+)["']\s*\]|\.([A-Za-z_]\w*))$"#,
        )
        .expect("Invalid regex")
    })
}

fn env_lookup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"System\.getenv\(\s*([^()]*?)\s*\)|providers\.environmentVariable\(\s*([^()]*?)\s*\)|System\.env\.([A-Za-z_]\w*)|System\.env\[\s*([^\]]*?)\s*\]",
        )
        .expect("Invalid regex")
    })
}

impl BuildScript {
    /// Read and parse a script from disk
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let dsl = Dsl::from_path(path).ok_or_else(|| GradleError::NotAScript(path.to_path_buf()))?;
        let content = std::fs::read_to_string(path).map_err(|source| GradleError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut script = Self::parse(&content, dsl)?;
        script.path = Some(path.to_path_buf());
        Ok(script)
    }

    /// Parse script text
    pub fn parse(content: &str, dsl: Dsl) -> Result<Self> {
        let source = Source::new(content)?;
        let mut parser = Parser {
            source: &source,
            script: BuildScript::empty(dsl),
            files: BTreeMap::new(),
        };

        // The root script declares plugins with `apply false` without applying them
        parser.script.is_application = source
            .text()
            .lines()
            .any(|l| l.contains("com.android.application") && !l.contains("apply false"));
        parser.walk(source.root(), false)?;
        parser.collect_env_lookups();

        let script = parser.script;
        debug!(
            dsl = %script.dsl,
            signing_configs = script.signing_configs.len(),
            build_types = script.build_types.len(),
            env_lookups = script.env_lookups.len(),
            "parsed build script"
        );
        Ok(script)
    }
}

struct Parser<'a> {
    source: &'a Source,
    script: BuildScript,
    /// `val f = rootProject.file("...")` declarations, name to path
    files: BTreeMap<String, String>,
}

impl<'a> Parser<'a> {
    fn text(&self, range: &Range<usize>) -> &'a str {
        let source: &'a Source = self.source;
        source.slice(range)
    }

    fn walk(&mut self, range: Range<usize>, guarded: bool) -> Result<()> {
        for node in self.source.nodes(range)? {
            let header = self.text(&node.header);
            let line = self.source.line(node.header.start);

            let Some(body) = node.body else {
                self.statement(header, line, guarded);
                continue;
            };

            if header == "android" {
                self.script.has_android_block = true;
                self.android(body)?;
            } else if header.starts_with("if") {
                self.walk(body, guarded || header.contains("exists()"))?;
            } else {
                self.walk(body, guarded)?;
            }
        }
        Ok(())
    }

    fn statement(&mut self, text: &str, line: usize, guarded: bool) {
        if let Some(caps) = declaration_regex().captures(text) {
            let name = caps[1].to_string();
            let rhs = caps[2].trim();

            if properties_ctor_regex().is_match(rhs) {
                self.script.properties.push(PropertiesObject {
                    name: name.clone(),
                    line,
                    load: None,
                });
                // `Properties().apply { load(...) }`
                if rhs.contains("load(") {
                    self.record_load(&name, rhs, line, guarded);
                }
                return;
            }

            if let SourceExpr::File(inner) = SourceExpr::parse(rhs) {
                if let SourceExpr::Literal(path) = *inner {
                    self.files.insert(name, path);
                }
                return;
            }
        }

        if let Some(caps) = load_call_regex().captures(text) {
            let object = caps[1].to_string();
            let known = self.script.properties_object(&object).is_some();
            if known || object.to_lowercase().contains("prop") {
                self.record_load(&object, text, line, guarded);
            }
        }
    }

    fn record_load(&mut self, object: &str, text: &str, line: usize, guarded: bool) {
        let file = self.load_file(text);
        let load = PropertiesLoad {
            line,
            file,
            guarded: guarded || text.contains("exists()"),
        };

        match self.script.properties.iter_mut().find(|p| p.name == object) {
            Some(existing) => existing.load = Some(load),
            None => self.script.properties.push(PropertiesObject {
                name: object.to_string(),
                line,
                load: Some(load),
            }),
        }
    }

    /// Path of the file a `load(...)` call reads, when written out
    fn load_file(&self, text: &str) -> Option<String> {
        if let Some(caps) = input_stream_regex().captures(text) {
            if let Some(arg) = caps.get(1).or_else(|| caps.get(2)) {
                let arg = arg.as_str().trim();
                if let Some(path) = self.files.get(arg) {
                    return Some(path.clone());
                }
                if let SourceExpr::File(inner) = SourceExpr::parse(arg) {
                    if let SourceExpr::Literal(path) = *inner {
                        return Some(path);
                    }
                }
            }
        }

        // `propsFile.takeIf { it.exists() }?.inputStream()?.use { ... }`
        let mut words = text.split(|c: char| !(c.is_alphanumeric() || c == '_'));
        words.find_map(|w| self.files.get(w).cloned())
    }

    fn android(&mut self, range: Range<usize>) -> Result<()> {
        for node in self.source.nodes(range)? {
            let header = self.text(&node.header);
            let line = self.source.line(node.header.start);

            match (node.body, header) {
                (Some(body), "defaultConfig") => self.settings(body)?,
                (Some(body), "signingConfigs") => self.signing_configs(body)?,
                (Some(body), "buildTypes") => self.build_types(body)?,
                (Some(body), _) => self.walk(body, false)?,
                (None, _) => {
                    if let Some((key, value)) = assignment(header) {
                        self.setting(key, value, line);
                    }
                    self.statement(header, line, false);
                }
            }
        }
        Ok(())
    }

    fn settings(&mut self, range: Range<usize>) -> Result<()> {
        for node in self.source.nodes(range)? {
            if node.is_block() {
                continue;
            }
            let header = self.text(&node.header);
            if let Some((key, value)) = assignment(header) {
                let line = self.source.line(node.header.start);
                self.setting(key, value, line);
            }
        }
        Ok(())
    }

    fn setting(&mut self, key: &str, value: &str, line: usize) {
        let slot = match key {
            "namespace" => &mut self.script.namespace,
            "applicationId" => &mut self.script.application_id,
            "compileSdk" | "compileSdkVersion" => &mut self.script.compile_sdk,
            "minSdk" | "minSdkVersion" => &mut self.script.min_sdk,
            "targetSdk" | "targetSdkVersion" => &mut self.script.target_sdk,
            "ndkVersion" => &mut self.script.ndk_version,
            "versionCode" => &mut self.script.version_code,
            "versionName" => &mut self.script.version_name,
            _ => return,
        };
        *slot = Some(Setting {
            value: ConfigValue::parse(value),
            line,
        });
    }

    fn signing_configs(&mut self, range: Range<usize>) -> Result<()> {
        for node in self.source.nodes(range)? {
            let Some(body) = node.body else { continue };
            let header = self.text(&node.header);
            let Some(name) = block_name(header) else {
                debug!(header, "skipping unrecognised signing config block");
                continue;
            };

            let mut block = SigningConfigBlock::new(name, self.source.line(node.header.start));
            for child in self.source.nodes(body)? {
                if child.is_block() {
                    continue;
                }
                let text = self.text(&child.header);
                let Some((key, value)) = assignment(text) else { continue };
                let Some(field) = CredentialField::from_key(key) else { continue };

                block.fields.insert(
                    field,
                    FieldAssignment {
                        expr: SourceExpr::parse(value),
                        raw: value.trim().to_string(),
                        line: self.source.line(child.header.start),
                    },
                );
            }
            self.script.signing_configs.push(block);
        }
        Ok(())
    }

    fn build_types(&mut self, range: Range<usize>) -> Result<()> {
        for node in self.source.nodes(range)? {
            let Some(body) = node.body else { continue };
            let header = self.text(&node.header);
            let Some(name) = block_name(header) else { continue };

            let mut block = BuildTypeBlock::new(name, self.source.line(node.header.start));
            for child in self.source.nodes(body)? {
                if child.is_block() {
                    continue;
                }
                let text = self.text(&child.header);
                let Some((key, value)) = assignment(text) else { continue };
                let line = self.source.line(child.header.start);

                match key {
                    "signingConfig" => {
                        block.signing_config = Some(SigningRefAt {
                            target: signing_ref(value),
                            line,
                        })
                    }
                    "isMinifyEnabled" | "minifyEnabled" => {
                        block.minify_enabled = ConfigValue::parse(value).as_bool()
                    }
                    "isShrinkResources" | "shrinkResources" => {
                        block.shrink_resources = ConfigValue::parse(value).as_bool()
                    }
                    _ => {}
                }
            }
            self.script.build_types.push(block);
        }
        Ok(())
    }

    fn collect_env_lookups(&mut self) {
        let text = self.source.text();
        for caps in env_lookup_regex().captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };

            let name = if let Some(dotted) = caps.get(3) {
                Some(dotted.as_str().to_string())
            } else {
                let arg = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(4))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                if arg.is_empty() {
                    continue;
                }
                string_literal(arg).filter(|s| !s.contains('$'))
            };

            self.script.env_lookups.push(EnvLookup {
                name,
                raw: whole.as_str().to_string(),
                line: self.source.line(whole.start()),
            });
        }
    }
}

/// `key = value`, `key value` or `key(value)`
fn assignment(text: &str) -> Option<(&str, &str)> {
    let caps = assignment_regex().captures(text)?;
    let key = caps.get(1)?.as_str();
    let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?.as_str().trim();
    if matches!(key, "val" | "var" | "def" | "if" | "return") {
        return None;
    }
    Some((key, value))
}

fn block_name(header: &str) -> Option<String> {
    let caps = block_name_regex().captures(header.trim())?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
}

fn signing_ref(value: &str) -> SigningRef {
    let value = value.trim();
    if value == "null" {
        return SigningRef::Null;
    }
    signing_ref_regex()
        .captures(value)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| SigningRef::Named(m.as_str().to_string()))
        .unwrap_or_else(|| SigningRef::Unknown(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FLUTTER_GROOVY, FLUTTER_KTS};
    use tempfile::TempDir;

    #[test]
    fn test_parse_flutter_kts() {
        let script = BuildScript::parse(FLUTTER_KTS, Dsl::Kotlin).unwrap();

        assert!(script.is_application);
        assert!(script.has_android_block);
        assert_eq!(
            script.namespace.as_ref().unwrap().value,
            ConfigValue::Str("com.example.darvin_app".to_string())
        );
        assert_eq!(script.compile_sdk.as_ref().unwrap().value, ConfigValue::Int(36));
        assert_eq!(script.min_sdk.as_ref().unwrap().value, ConfigValue::Int(26));
        assert_eq!(script.min_sdk.as_ref().unwrap().line, 26);
        assert!(script.version_code.as_ref().unwrap().value.is_delegated());

        let props = script.properties_object("keystoreProperties").unwrap();
        let load = props.load.as_ref().unwrap();
        assert!(load.guarded);
        assert_eq!(load.file.as_deref(), Some("key.properties"));
        assert_eq!(script.properties_file_for("keystoreProperties"), Some("key.properties"));

        let release = script.signing_config("release").unwrap();
        assert_eq!(release.line, 33);
        assert!(release.missing_fields().is_empty());
        let store_file = release.field(CredentialField::StoreFile).unwrap();
        assert!(store_file.expr.is_env_only());
        assert_eq!(store_file.line, 36);

        let alias = release.field(CredentialField::KeyAlias).unwrap();
        assert_eq!(alias.expr.env_vars(), vec!["BITRISEIO_ANDROID_KEYSTORE_ALIAS"]);
        assert_eq!(alias.expr.properties(), vec![("keystoreProperties", "keyAlias")]);

        assert_eq!(
            script.build_type("release").unwrap().signing_target(),
            Some(&SigningRef::Named("release".to_string()))
        );
        assert_eq!(script.signing_config_for("release").unwrap().name, "release");

        let names: Vec<_> = script.env_lookups.iter().filter_map(|e| e.name.as_deref()).collect();
        assert_eq!(
            names,
            vec![
                "BITRISEIO_ANDROID_KEYSTORE_ALIAS",
                "BITRISEIO_ANDROID_KEYSTORE_PRIVATE_KEY_PASSWORD",
                "BITRISEIO_ANDROID_KEYSTORE_PATH",
                "BITRISEIO_ANDROID_KEYSTORE_PASSWORD",
            ]
        );
        assert_eq!(script.env_lookups[0].line, 34);
    }

    #[test]
    fn test_parse_flutter_groovy() {
        let script = BuildScript::parse(FLUTTER_GROOVY, Dsl::Groovy).unwrap();

        assert!(script.is_application);
        assert!(script.compile_sdk.as_ref().unwrap().value.is_delegated());
        assert_eq!(script.target_sdk.as_ref().unwrap().value, ConfigValue::Int(34));

        let load = script.properties_object("keystoreProperties").unwrap().load.clone().unwrap();
        assert!(!load.guarded);
        assert_eq!(load.file.as_deref(), Some("key.properties"));

        let release = script.signing_config("release").unwrap();
        assert_eq!(
            release.field(CredentialField::KeyAlias).unwrap().expr,
            SourceExpr::Property {
                object: "keystoreProperties".to_string(),
                key: "keyAlias".to_string(),
            }
        );

        let build_type = script.build_type("release").unwrap();
        assert_eq!(build_type.signing_target(), Some(&SigningRef::Named("debug".to_string())));
        assert_eq!(build_type.minify_enabled, Some(true));
        assert_eq!(build_type.shrink_resources, Some(false));
        assert!(script.env_lookups.is_empty());
    }

    #[test]
    fn test_kotlin_takeif_load_is_guarded() {
        let script = BuildScript::parse(
            r#"val props = Properties()
val propsFile = rootProject.file("key.properties")
propsFile.takeIf { it.exists() }?.inputStream()?.use { props.load(it) }
"#,
            Dsl::Kotlin,
        )
        .unwrap();

        let load = script.properties_object("props").unwrap().load.clone().unwrap();
        assert!(load.guarded);
        assert_eq!(load.file.as_deref(), Some("key.properties"));
    }

    #[test]
    fn test_properties_apply_load() {
        let script = BuildScript::parse(
            r#"val signing = Properties().apply { load(FileInputStream(rootProject.file("signing.properties"))) }"#,
            Dsl::Kotlin,
        )
        .unwrap();

        let load = script.properties_object("signing").unwrap().load.clone().unwrap();
        assert_eq!(load.file.as_deref(), Some("signing.properties"));
        assert!(!load.guarded);
    }

    #[test]
    fn test_signing_refs() {
        assert_eq!(signing_ref("null"), SigningRef::Null);
        assert_eq!(
            signing_ref(r#"signingConfigs.getByName("upload")"#),
            SigningRef::Named("upload".to_string())
        );
        assert_eq!(signing_ref("signingConfigs['upload']"), SigningRef::Named("upload".to_string()));
        assert_eq!(signing_ref("signingConfigs.upload"), SigningRef::Named("upload".to_string()));
        assert!(matches!(
            signing_ref("if (ci) signingConfigs.release else signingConfigs.debug"),
            SigningRef::Unknown(_)
        ));
    }

    #[test]
    fn test_block_names() {
        assert_eq!(block_name(r#"create("release")"#).as_deref(), Some("release"));
        assert_eq!(block_name("getByName('debug')").as_deref(), Some("debug"));
        assert_eq!(block_name("release").as_deref(), Some("release"));
        assert_eq!(block_name("android.applicationVariants.all"), None);
    }

    #[test]
    fn test_assignment_forms() {
        assert_eq!(assignment("keyAlias = \"a\""), Some(("keyAlias", "\"a\"")));
        assert_eq!(assignment("keyAlias 'a'"), Some(("keyAlias", "'a'")));
        assert_eq!(assignment("minSdkVersion(21)"), Some(("minSdkVersion", "21")));
        assert_eq!(assignment("val x = 1"), None);
    }

    #[test]
    fn test_commented_env_lookup_ignored() {
        let script = BuildScript::parse(
            "// System.getenv(\"OLD_PASSWORD\")\nval a = System.getenv(\"NEW_PASSWORD\")\nval b = System.getenv(name)\n",
            Dsl::Kotlin,
        )
        .unwrap();
        assert_eq!(script.env_lookups.len(), 2);
        assert_eq!(script.env_lookups[0].name.as_deref(), Some("NEW_PASSWORD"));
        assert_eq!(script.env_lookups[0].line, 2);
        assert_eq!(script.env_lookups[1].name, None);
    }

    #[test]
    fn test_load_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("build.gradle.kts");
        std::fs::write(&path, FLUTTER_KTS).unwrap();

        let script = BuildScript::load(&path).unwrap();
        assert_eq!(script.dsl, Dsl::Kotlin);
        assert_eq!(script.path.as_deref(), Some(path.as_path()));

        let err = BuildScript::load(&temp.path().join("settings.txt")).unwrap_err();
        assert!(matches!(err, GradleError::NotAScript(_)));

        let err = BuildScript::load(&temp.path().join("missing.gradle")).unwrap_err();
        assert!(matches!(err, GradleError::Read { .. }));
    }
}
