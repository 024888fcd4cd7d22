//! Java `.properties` files
//!
//! Gradle builds load `key.properties` through `java.util.Properties`, so
//! parsing follows the same rules: `#`/`!` comments, `=`/`:`/whitespace
//! separators, backslash line continuations and `\uXXXX` escapes.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::error::{Result, SigningError};

/// Syntax error in a properties document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct PropertiesSyntaxError {
    /// 1-based line where the logical line starts
    pub line: usize,
    /// What went wrong
    pub message: String,
}

/// Parsed key/value pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Create an empty set of properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and parse a properties file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let properties = Self::parse(&content).map_err(|source| SigningError::Properties {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), entries = properties.len(), "loaded properties file");
        Ok(properties)
    }

    /// Parse properties text. Later duplicates override earlier ones.
    pub fn parse(content: &str) -> std::result::Result<Self, PropertiesSyntaxError> {
        let mut entries = BTreeMap::new();
        let mut lines = content.lines().enumerate().peekable();

        while let Some((index, raw)) = lines.next() {
            let line = raw.trim_start_matches(is_blank);
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let mut logical = line.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some((_, next)) => logical.push_str(next.trim_start_matches(is_blank)),
                    None => break,
                }
            }

            let (key, value) = split_key_value(&logical);
            let key = unescape(key).map_err(|message| PropertiesSyntaxError {
                line: index + 1,
                message,
            })?;
            let value = unescape(value).map_err(|message| PropertiesSyntaxError {
                line: index + 1,
                message,
            })?;
            entries.insert(key, value);
        }

        Ok(Self { entries })
    }

    /// Value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Format one `key=value` line with the escapes `java.util.Properties` expects
pub fn format_entry(key: &str, value: &str) -> String {
    format!("{}={}", escape(key, true), escape(value, false))
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{000C}')
}

/// An odd number of trailing backslashes continues the line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split at the first unescaped separator and return the raw (still escaped) parts
fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                let value = line[i + 1..].trim_start_matches(is_blank);
                return (&line[..i], value);
            }
            c if is_blank(c) => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    if key_end == line.len() {
        return (line, "");
    }

    let rest = line[key_end..].trim_start_matches(is_blank);
    let rest = match rest.chars().next() {
        Some('=') | Some(':') => rest[1..].trim_start_matches(is_blank),
        _ => rest,
    };
    (&line[..key_end], rest)
}

fn unescape(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let unit = utf16_unit(&mut chars)?;
                let mut units = vec![unit];
                if (0xD800..=0xDBFF).contains(&unit) {
                    // A high surrogate pairs with an immediately following \uDC00-\uDFFF
                    let mut ahead = chars.clone();
                    if ahead.next() == Some('\\') && ahead.next() == Some('u') {
                        if let Ok(low) = utf16_unit(&mut ahead) {
                            if (0xDC00..=0xDFFF).contains(&low) {
                                units.push(low);
                                chars = ahead;
                            }
                        }
                    }
                }
                out.extend(
                    char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
                );
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// The four hex digits after `\u`
fn utf16_unit(chars: &mut std::str::Chars<'_>) -> std::result::Result<u16, String> {
    let hex: String = chars.by_ref().take(4).collect();
    let malformed = || format!("malformed \\u escape '\\u{}'", hex);
    if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(malformed());
    }
    u16::from_str_radix(&hex, 16).map_err(|_| malformed())
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());

    for (i, c) in text.chars().enumerate() {
        match c {
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{000C}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if (' '..='~').contains(&c) => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04X}", unit));
                }
            }
        }
    }

    out
}
