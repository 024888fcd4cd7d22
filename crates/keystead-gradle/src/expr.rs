//! Right-hand sides of signing assignments

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use keystead_core::config::validation::is_valid_env_name;
use keystead_core::config::CredentialSource;

/// Shown in place of secret values
pub const REDACTED: &str = "********";

/// Where a signing attribute's value comes from, as written in the script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SourceExpr {
    /// A string literal
    Literal(String),
    /// An environment variable lookup by name
    Env(String),
    /// A lookup in a `Properties` object
    Property { object: String, key: String },
    /// `file(...)` around another source
    File(Box<SourceExpr>),
    /// Alternatives tried in order (`?:` chains, Groovy ternaries)
    Elvis(Vec<SourceExpr>),
    /// The `null` literal
    Null,
    /// Anything else
    Unknown(String),
}

fn env_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?:System\.getenv\(\s*(?:"([^"]*)"|'([^']*)')\s*\)|providers\.environmentVariable\(\s*(?:"([^"]*)"|'([^']*)')\s*\)|System\.env\.([A-Za-z_]\w*)|System\.env\[\s*(?:"([^"]*)"|'([^']*)')\s*\])$"#,
        )
        .expect("Invalid regex")
    })
}

fn property_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^([A-Za-z_]\w*)(?:\[\s*(?:"([^"]*)"|'([^']*)')\s*\]|\.getProperty\(\s*(?:"([^"]*)"|'([^']*)')\s*\))$"#,
        )
        .expect("Invalid regex")
    })
}

fn dotted_property_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_]\w*)\.([A-Za-z_]\w*)$").expect("Invalid regex"))
}

fn file_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^(?:new\s+File|File|rootProject\.file|project\.file|file)\((.*)\)$")
            .expect("Invalid regex")
    })
}

fn let_file_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)^(.+?)\??\.let\s*(?:\{\s*(?:it\s*->\s*)?(?:rootProject\.|project\.)?file\(\s*it\s*\)\s*\}|\(\s*::file\s*\))$",
        )
        .expect("Invalid regex")
    })
}

fn first_group(caps: &regex::Captures<'_>, from: usize) -> Option<String> {
    (from..caps.len()).find_map(|i| caps.get(i).map(|m| m.as_str().to_string()))
}

impl SourceExpr {
    /// Parse an expression as written after `storeFile =`, `keyAlias `, etc.
    pub fn parse(text: &str) -> Self {
        let text = strip_suffixes(text.trim());

        if text.is_empty() {
            return Self::Unknown(String::new());
        }
        if text == "null" {
            return Self::Null;
        }

        let parts = split_top_level(text, "?:");
        if parts.len() > 1 {
            return Self::Elvis(parts.into_iter().map(Self::parse).collect());
        }

        if let Some((then, otherwise)) = split_ternary(text) {
            return Self::Elvis(vec![Self::parse(then), Self::parse(otherwise)]);
        }

        if let Some(caps) = let_file_regex().captures(text) {
            return Self::File(Box::new(Self::parse(&caps[1])));
        }

        if let Some(value) = string_literal(text) {
            if value.contains('$') {
                return Self::Unknown(text.to_string());
            }
            return Self::Literal(value);
        }

        if let Some(caps) = env_regex().captures(text) {
            if let Some(name) = first_group(&caps, 1) {
                return Self::Env(name);
            }
        }

        if let Some(caps) = file_call_regex().captures(text) {
            let inner = &caps[1];
            if balanced(inner) {
                return Self::File(Box::new(Self::parse(inner)));
            }
        }

        if let Some(caps) = property_regex().captures(text) {
            if let Some(key) = first_group(&caps, 2) {
                return Self::Property {
                    object: caps[1].to_string(),
                    key,
                };
            }
        }

        if let Some(caps) = dotted_property_regex().captures(text) {
            if caps[1].to_lowercase().contains("prop") {
                return Self::Property {
                    object: caps[1].to_string(),
                    key: caps[2].to_string(),
                };
            }
        }

        Self::Unknown(text.to_string())
    }

    /// Leaf sources in the order they are tried, with `file(...)` unwrapped
    pub fn alternatives(&self) -> Vec<&SourceExpr> {
        match self {
            Self::Elvis(parts) => parts.iter().flat_map(|p| p.alternatives()).collect(),
            Self::File(inner) => inner.alternatives(),
            other => vec![other],
        }
    }

    /// Environment variable names referenced
    pub fn env_vars(&self) -> Vec<&str> {
        self.alternatives()
            .into_iter()
            .filter_map(|e| match e {
                Self::Env(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// `(object, key)` pairs of properties lookups
    pub fn properties(&self) -> Vec<(&str, &str)> {
        self.alternatives()
            .into_iter()
            .filter_map(|e| match e {
                Self::Property { object, key } => Some((object.as_str(), key.as_str())),
                _ => None,
            })
            .collect()
    }

    /// String literals used as values
    pub fn literals(&self) -> Vec<&str> {
        self.alternatives()
            .into_iter()
            .filter_map(|e| match e {
                Self::Literal(value) => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// True when the only way to get a value is an environment variable
    pub fn is_env_only(&self) -> bool {
        let alternatives: Vec<_> = self
            .alternatives()
            .into_iter()
            .filter(|e| !matches!(e, Self::Null))
            .collect();
        !alternatives.is_empty() && alternatives.iter().all(|e| matches!(e, Self::Env(_)))
    }

    /// Equivalent resolver configuration: first env, first property, first literal
    pub fn to_credential_source(&self) -> CredentialSource {
        let mut source = CredentialSource::default();
        for alternative in self.alternatives() {
            match alternative {
                Self::Env(name) if source.env.is_none() => source.env = Some(name.clone()),
                Self::Property { key, .. } if source.property.is_none() => {
                    source.property = Some(key.clone())
                }
                Self::Literal(value) if source.literal.is_none() => {
                    source.literal = Some(value.clone())
                }
                _ => {}
            }
        }
        source
    }
}

impl std::fmt::Display for SourceExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "\"{}\"", value),
            Self::Env(name) => write!(f, "env {}", name),
            Self::Property { object, key } => write!(f, "{}[\"{}\"]", object, key),
            Self::File(inner) => write!(f, "file({})", inner),
            Self::Elvis(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ?: ")?;
                    }
                    write!(f, "{}", part)?;
                }
                Ok(())
            }
            Self::Null => write!(f, "null"),
            Self::Unknown(text) => write!(f, "{}", text),
        }
    }
}

impl SourceExpr {
    /// Copy with literal values, and variable names that are really values, masked
    pub fn redacted(&self) -> SourceExpr {
        match self {
            Self::Literal(_) => Self::Literal(REDACTED.to_string()),
            Self::Env(name) if !is_valid_env_name(name) => Self::Env(REDACTED.to_string()),
            Self::File(inner) => Self::File(Box::new(inner.redacted())),
            Self::Elvis(parts) => Self::Elvis(parts.iter().map(Self::redacted).collect()),
            other => other.clone(),
        }
    }
}

/// Remove casts and accessors that do not change where a value comes from
fn strip_suffixes(mut text: &str) -> &str {
    const SUFFIXES: [&str; 8] = [
        "as String?",
        "as String",
        "?.toString()",
        ".toString()",
        "!!",
        ".orNull",
        ".getOrNull()",
        ".get()",
    ];

    loop {
        let before = text;
        for suffix in SUFFIXES {
            if let Some(rest) = text.strip_suffix(suffix) {
                text = rest.trim_end();
            }
        }
        if text.len() == before.len() {
            return text;
        }
    }
}

/// Contents of a single- or double-quoted string literal spanning the whole text
pub(crate) fn string_literal(text: &str) -> Option<String> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }

    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => return None,
            },
            c if c == quote => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

/// Byte offsets of top-level positions (outside strings and brackets) paired with depth-0 flags
fn top_level_positions(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut positions = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => positions.push(i),
            _ => {}
        }
        i += 1;
    }

    positions
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for b in text.bytes() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Split on a top-level operator
pub(crate) fn split_top_level<'a>(text: &'a str, op: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;

    for pos in top_level_positions(text) {
        if pos < start {
            continue;
        }
        if text[pos..].starts_with(op) {
            parts.push(text[start..pos].trim());
            start = pos + op.len();
        }
    }

    parts.push(text[start..].trim());
    parts
}

/// `cond ? a : b` at the top level, returning `(a, b)`
fn split_ternary(text: &str) -> Option<(&str, &str)> {
    let positions = top_level_positions(text);
    let bytes = text.as_bytes();

    let question = positions.iter().copied().find(|&i| {
        bytes[i] == b'?' && !matches!(bytes.get(i + 1), Some(b'.') | Some(b':'))
    })?;
    let colon = positions
        .iter()
        .copied()
        .find(|&i| i > question && bytes[i] == b':' && bytes[i - 1] != b'?')?;

    Some((text[question + 1..colon].trim(), text[colon + 1..].trim()))
}
