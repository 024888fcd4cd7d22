//! Lexical structure of Gradle scripts
//!
//! Both DSLs share enough syntax that a script can be read as a tree of
//! brace-delimited blocks and newline-separated statements. Comments are
//! blanked out first so byte offsets, and therefore line numbers, still
//! match the file on disk.

use std::ops::Range;

use crate::error::{GradleError, Result};

/// Functions whose trailing lambda is part of an expression, not a configuration block
const EXPRESSION_LAMBDAS: [&str; 9] = [
    ".let", ".also", ".apply", ".run", ".with", ".takeIf", ".takeUnless", ".use", ".map",
];

/// Tokens that, at the end of a line, continue the statement onto the next line
const TRAILING_CONTINUATIONS: [&str; 8] = ["=", "?:", "+", ",", "(", "&&", "||", "."];

/// Tokens that, at the start of a line, continue the previous statement
const LEADING_CONTINUATIONS: [&str; 6] = ["?:", "?.", ".", "&&", "||", ": "];

/// A statement or a block header with its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Node {
    /// Statement text, or the text before a block's opening brace
    pub header: Range<usize>,
    /// Text between a block's braces
    pub body: Option<Range<usize>>,
}

impl Node {
    pub fn is_block(&self) -> bool {
        self.body.is_some()
    }
}

/// A script with comments removed
#[derive(Debug, Clone)]
pub(crate) struct Source {
    text: String,
}

impl Source {
    pub fn new(raw: &str) -> Result<Self> {
        Ok(Self {
            text: strip_comments(raw)?,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> Range<usize> {
        0..self.text.len()
    }

    pub fn slice(&self, range: &Range<usize>) -> &str {
        &self.text[range.clone()]
    }

    /// 1-based line of a byte offset
    pub fn line(&self, offset: usize) -> usize {
        line_of(self.text.as_bytes(), offset)
    }

    /// Split a range into top-level nodes
    pub fn nodes(&self, range: Range<usize>) -> Result<Vec<Node>> {
        let bytes = self.text.as_bytes();
        let mut nodes = Vec::new();
        let mut start = range.start;
        let mut depth = 0usize;
        let mut i = range.start;

        while i < range.end {
            match bytes[i] {
                b'"' | b'\'' => {
                    i = skip_string(bytes, i)?;
                    continue;
                }
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                b'{' => {
                    let close = match_brace(bytes, i)?;
                    if close >= range.end {
                        return Err(GradleError::Unbalanced {
                            line: self.line(i),
                            message: "block extends past its parent".to_string(),
                        });
                    }

                    let header = trim(bytes, start..i);
                    if depth == 0 && is_block_header(&self.text[header.clone()]) {
                        nodes.push(Node {
                            header,
                            body: Some(i + 1..close),
                        });
                        start = close + 1;
                    }
                    i = close + 1;
                    continue;
                }
                b'}' => {
                    return Err(GradleError::Unbalanced {
                        line: self.line(i),
                        message: "unexpected closing brace".to_string(),
                    });
                }
                b'\n' | b';' if depth == 0 => {
                    if !self.continues(start..i, i + 1, range.end) {
                        push_statement(&mut nodes, bytes, start..i);
                        start = i + 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        push_statement(&mut nodes, bytes, start..range.end);
        Ok(nodes)
    }

    /// Whether the statement in `current` carries on past the line break
    fn continues(&self, current: Range<usize>, next: usize, end: usize) -> bool {
        let statement = self.text[current].trim();
        if statement.is_empty() {
            return false;
        }

        if TRAILING_CONTINUATIONS
            .iter()
            .any(|t| statement.ends_with(t) && !statement.ends_with("++"))
        {
            return true;
        }

        let rest = self.text[next.min(end)..end].trim_start();
        LEADING_CONTINUATIONS.iter().any(|t| rest.starts_with(t))
    }
}

fn push_statement(nodes: &mut Vec<Node>, bytes: &[u8], range: Range<usize>) {
    let range = trim(bytes, range);
    if !range.is_empty() {
        nodes.push(Node {
            header: range,
            body: None,
        });
    }
}

fn trim(bytes: &[u8], mut range: Range<usize>) -> Range<usize> {
    while range.start < range.end && bytes[range.start].is_ascii_whitespace() {
        range.start += 1;
    }
    while range.end > range.start && bytes[range.end - 1].is_ascii_whitespace() {
        range.end -= 1;
    }
    range
}

/// Whether text before `{` names a configuration block rather than a lambda argument
fn is_block_header(header: &str) -> bool {
    let Some(last) = header.chars().last() else {
        return false;
    };
    if !(last.is_alphanumeric() || last == '_' || last == ')' || last == '"' || last == '\'') {
        return false;
    }
    if header.contains("?:") || header.contains("?.") {
        return false;
    }
    if EXPRESSION_LAMBDAS.iter().any(|l| header.ends_with(l)) {
        return false;
    }
    !has_top_level_assignment(header)
}

fn has_top_level_assignment(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => match skip_string(bytes, i) {
                Ok(next) => {
                    i = next;
                    continue;
                }
                Err(_) => return false,
            },
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 => {
                let prev = i.checked_sub(1).map(|p| bytes[p]);
                let next = bytes.get(i + 1).copied();
                let comparison = matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) || next == Some(b'=');
                if !comparison {
                    return true;
                }
            }
            _ => {}
        }
        i += 1;
    }

    false
}

fn line_of(bytes: &[u8], offset: usize) -> usize {
    bytes[..offset.min(bytes.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// Replace comments with spaces, keeping newlines
fn strip_comments(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i)?,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                for b in &mut out[start..i] {
                    if *b != b'\n' {
                        *b = b' ';
                    }
                }
            }
            _ => i += 1,
        }
    }

    // Only whole comments were replaced, so the bytes are still valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Offset just past the string literal starting at `start`
fn skip_string(bytes: &[u8], start: usize) -> Result<usize> {
    let quote = bytes[start];

    if bytes[start..].starts_with(&[quote, quote, quote]) {
        let mut i = start + 3;
        while i + 3 <= bytes.len() {
            if bytes[i..i + 3] == [quote, quote, quote] {
                return Ok(i + 3);
            }
            i += 1;
        }
        return Err(GradleError::UnterminatedString {
            line: line_of(bytes, start),
        });
    }

    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if quote == b'"' && bytes.get(i + 1) == Some(&b'{') => {
                i = match_brace(bytes, i + 1)? + 1;
            }
            b'\n' => break,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }

    Err(GradleError::UnterminatedString {
        line: line_of(bytes, start),
    })
}

/// Offset of the `}` matching the `{` at `open`
fn match_brace(bytes: &[u8], open: usize) -> Result<usize> {
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    Err(GradleError::Unbalanced {
        line: line_of(bytes, open),
        message: "missing closing brace".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(source: &Source, range: Range<usize>) -> Vec<String> {
        source
            .nodes(range)
            .unwrap()
            .iter()
            .map(|n| source.slice(&n.header).to_string())
            .collect()
    }

    #[test]
    fn test_strip_comments_keeps_offsets() {
        let raw = "a = 1 // it's a comment\n/* block\n comment */b = \"//not\"\n";
        let source = Source::new(raw).unwrap();
        assert_eq!(source.text().len(), raw.len());
        assert!(!source.text().contains("comment"));
        assert!(source.text().contains("\"//not\""));
        assert_eq!(source.line(source.text().find("b =").unwrap()), 3);
    }

    #[test]
    fn test_blocks_and_statements() {
        let source = Source::new(
            "plugins {\n    id(\"com.android.application\")\n}\n\nval x = 1\nandroid {\n    namespace = \"a.b\"\n}\n",
        )
        .unwrap();

        let nodes = source.nodes(source.root()).unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes[0].is_block());
        assert_eq!(source.slice(&nodes[1].header), "val x = 1");
        assert!(!nodes[1].is_block());

        let android = nodes[2].body.clone().unwrap();
        assert_eq!(headers(&source, android), vec!["namespace = \"a.b\""]);
    }

    #[test]
    fn test_lambda_stays_in_statement() {
        let source = Source::new(
            "storeFile = System.getenv(\"P\")?.let { file(it) }\nkeyAlias = \"upload\"\n",
        )
        .unwrap();
        assert_eq!(
            headers(&source, source.root()),
            vec!["storeFile = System.getenv(\"P\")?.let { file(it) }", "keyAlias = \"upload\""]
        );
    }

    #[test]
    fn test_continuation_lines_join() {
        let source = Source::new(
            "keyAlias = System.getenv(\"ALIAS\")\n    ?: props[\"keyAlias\"] as String?\nnext = 1\n",
        )
        .unwrap();
        let nodes = headers(&source, source.root());
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].contains("?: props"));
    }

    #[test]
    fn test_named_block_with_call_header() {
        let source = Source::new("create(\"release\") {\n    keyAlias = \"a\"\n}\n").unwrap();
        let nodes = source.nodes(source.root()).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(source.slice(&nodes[0].header), "create(\"release\")");
    }

    #[test]
    fn test_if_else_blocks() {
        let source =
            Source::new("if (f.exists()) {\n    p.load(f.inputStream())\n} else {\n    x = 1\n}\n").unwrap();
        assert_eq!(headers(&source, source.root()), vec!["if (f.exists())", "else"]);
    }

    #[test]
    fn test_template_with_nested_quotes() {
        let source = Source::new("a = \"${if (b) \"x\" else \"y\"}\"\nc = 2\n").unwrap();
        assert_eq!(headers(&source, source.root()).len(), 2);
    }

    #[test]
    fn test_unbalanced_braces() {
        let source = Source::new("android {\n    x = 1\n").unwrap();
        assert!(matches!(
            source.nodes(source.root()).unwrap_err(),
            GradleError::Unbalanced { line: 1, .. }
        ));

        let source = Source::new("x = 1\n}\n").unwrap();
        assert!(matches!(
            source.nodes(source.root()).unwrap_err(),
            GradleError::Unbalanced { line: 2, .. }
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            Source::new("a = \"oops\nb = 1\n").unwrap_err(),
            GradleError::UnterminatedString { line: 1 }
        ));
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        assert!(is_block_header("if (a == b)"));
        assert!(!is_block_header("val x = foo"));
        assert!(!is_block_header("x?.let"));
    }
}
