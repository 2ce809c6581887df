use crate::formatting::{FormattingContext, Newline};
use crate::parsers::{
    BumperError, MinimalDiffWriter, Parser, Splice, StructuralWriter, WriteRequest, apply_splices,
};
use anyhow::{Context, Result};
use log::debug;
use regex::Regex;
use std::ops::Range;
use toml_edit::{DocumentMut, Item, Table, TableLike, Value};

pub struct TomlParser;

impl TomlParser {
    /// Matches `key = "previous"` and captures the span of the previous value.
    ///
    /// The key may appear in several tables, see [`TomlParser::holds_path`].
    fn value_regex(key: &str, previous: &str) -> Result<Regex> {
        Ok(Regex::new(&format!(
            r#"(?m)(?:^|[\s{{,])["']?{}["']?[ \t]*=[ \t]*["']?({})(?:["'\s,}}]|$)"#,
            regex::escape(key),
            regex::escape(previous)
        ))?)
    }

    fn segments(path: &str) -> Result<Vec<&str>> {
        let segments: Vec<&str> = path.split('.').map(str::trim).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(BumperError::InvalidPath { path: path.to_string() }.into());
        }
        Ok(segments)
    }

    fn lookup<'a>(document: &'a DocumentMut, path: &str) -> Result<Option<&'a Item>> {
        let mut item = document.as_item();
        for segment in Self::segments(path)? {
            match item.get(segment) {
                Some(child) => item = child,
                None => return Ok(None),
            }
        }
        Ok(Some(item))
    }

    /// Whether replacing `span` with `value` is what sets `path` to `value`.
    fn holds_path(contents: &str, span: &Range<usize>, path: &str, value: &str) -> bool {
        let candidate = apply_splices(contents, vec![Splice::new(span.clone(), value)]);
        Self::parse_document(&candidate)
            .ok()
            .and_then(|document| Self::lookup(&document, path).ok().flatten().and_then(Self::item_text))
            .is_some_and(|current| current == value)
    }

    fn item_text(item: &Item) -> Option<String> {
        item.as_str()
            .map(str::to_string)
            .or_else(|| item.as_integer().map(|i| i.to_string()))
            .or_else(|| item.as_float().map(|f| f.to_string()))
    }
}

impl Parser for TomlParser {
    fn read_value(contents: &str, path: &str) -> Result<Option<String>> {
        let document = Self::parse_document(contents)?;
        Ok(Self::lookup(&document, path)?.and_then(Self::item_text))
    }

    fn write_value(contents: Option<&str>, request: &WriteRequest) -> Result<String> {
        let Some(contents) = contents.filter(|contents| !contents.trim().is_empty()) else {
            return Self::write_structural(contents, request);
        };

        let text = Self::write_minimal(contents, request)?;
        let mut document = Self::parse_document(&text.replace("\r\n", "\n"))?;
        let mut pending = Vec::new();
        for path in &request.paths {
            let current = Self::lookup(&document, path)?.and_then(Self::item_text);
            if current.as_deref() != Some(request.value.as_str()) {
                pending.push(path);
            }
        }
        if pending.is_empty() {
            return Ok(text);
        }

        debug!("Editing TOML structurally for {:?}", pending);
        for path in pending {
            Self::set_value(&mut document, path, &request.value)?;
        }
        Self::serialize_document(
            &document,
            &FormattingContext {
                newline: Newline::detect(&text),
                ..FormattingContext::default()
            },
        )
    }
}

impl MinimalDiffWriter for TomlParser {
    /// Only paths whose current value equals the previous version are located; the rest are
    /// left to the structural edit.
    fn splices(contents: &str, request: &WriteRequest) -> Result<Vec<Splice>> {
        let Some(previous) = request.previous.as_deref() else {
            return Ok(Vec::new());
        };
        let document = Self::parse_document(contents)?;

        let mut splices: Vec<Splice> = Vec::with_capacity(request.paths.len());
        for path in &request.paths {
            let current = Self::lookup(&document, path)?.and_then(Self::item_text);
            if current.as_deref() != Some(previous) {
                continue;
            }
            let segments = Self::segments(path)?;
            let key = segments.last().copied().unwrap_or_default();
            let span = Self::value_regex(key, previous)?
                .captures_iter(contents)
                .filter_map(|captures| captures.get(1))
                .map(|value| value.range())
                .filter(|span| !splices.iter().any(|splice| splice.span == *span))
                .find(|span| Self::holds_path(contents, span, path, &request.value));
            match span {
                Some(span) => splices.push(Splice::new(span, request.value.clone())),
                None => debug!("No '{}' assignment of {} found for '{}'", key, previous, path),
            }
        }
        Ok(splices)
    }
}

impl StructuralWriter for TomlParser {
    type Document = DocumentMut;

    fn parse_document(contents: &str) -> Result<DocumentMut> {
        contents.parse::<DocumentMut>().context("Invalid TOML")
    }

    fn empty_document() -> DocumentMut {
        DocumentMut::new()
    }

    fn set_value(document: &mut DocumentMut, path: &str, value: &str) -> Result<()> {
        let segments = Self::segments(path)?;
        assign(document.as_table_mut(), &segments, value, path)
    }

    fn serialize_document(document: &DocumentMut, formatting: &FormattingContext) -> Result<String> {
        Ok(formatting.newline.apply(&document.to_string()))
    }
}

/// Sets `segments` below `table`, keeping the whitespace and comments around an existing value.
fn assign(table: &mut dyn TableLike, segments: &[&str], value: &str, path: &str) -> Result<()> {
    match segments {
        [] => Err(BumperError::InvalidPath { path: path.to_string() }.into()),
        [key] => {
            match table.get_mut(key) {
                Some(Item::Value(existing)) => {
                    let decor = existing.decor().clone();
                    *existing = Value::from(value);
                    *existing.decor_mut() = decor;
                }
                _ => {
                    table.insert(key, toml_edit::value(value));
                }
            }
            Ok(())
        }
        [key, rest @ ..] => {
            if table.get(key).and_then(Item::as_table_like).is_none() {
                let mut child = Table::new();
                child.set_implicit(true);
                table.insert(key, Item::Table(child));
            }
            let child = table
                .get_mut(key)
                .and_then(Item::as_table_like_mut)
                .ok_or_else(|| BumperError::InvalidPath { path: path.to_string() })?;
            assign(child, rest, value, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARGO: &str = "[workspace]\n\n[package]\nname = \"hello_world\"\nversion = \"1.0.0\"\nauthors = [ \"Alice <a@example.com>\", \"Bob <b@example.com>\" ]\n\n[dependencies]\ntime = \"0.1.12\"\n";

    fn bump(contents: Option<&str>, path: &str, previous: Option<&str>) -> String {
        let request = WriteRequest::new(path, "1.0.1").with_previous(previous);
        TomlParser::write_value(contents, &request).unwrap()
    }

    #[test]
    fn test_read_nested_table() {
        let source = "[tool.test]\nversion = \"1.0.0\"\n";
        assert_eq!(
            TomlParser::read_value(source, "tool.test.version").unwrap(),
            Some("1.0.0".to_string())
        );
        assert_eq!(TomlParser::read_value(source, "version").unwrap(), None);
    }

    #[test]
    fn test_read_invalid_toml_fails() {
        let source = "/# -*- some invalid toml -*-\nversion = \"1.0.0\"\n";
        assert!(TomlParser::read_value(source, "version").is_err());
    }

    #[test]
    fn test_surgical_write_leaves_other_bytes() {
        let output = bump(Some(CARGO), "package.version", Some("1.0.0"));
        assert_eq!(output, CARGO.replace("version = \"1.0.0\"", "version = \"1.0.1\""));
    }

    #[test]
    fn test_surgical_write_keeps_comments_and_inline_tables() {
        let source = "[project]\nname = \"foo\"\nversion = \"1.0.0\"\n# these are authors\nauthors = [{ name = \"Alice\", email = \"a@example.com\" }]\n";
        let output = bump(Some(source), "project.version", Some("1.0.0"));
        assert_eq!(output, source.replace("1.0.0", "1.0.1"));
    }

    #[test]
    fn test_surgical_write_skips_value_with_longer_suffix() {
        let source = "[a]\nversion = \"1.0.0-beta\"\n\n[b]\nversion = \"1.0.0\"\n";
        let output = bump(Some(source), "b.version", Some("1.0.0"));
        assert_eq!(output, "[a]\nversion = \"1.0.0-beta\"\n\n[b]\nversion = \"1.0.1\"\n");
    }

    #[test]
    fn test_surgical_write_skips_same_value_in_earlier_table() {
        let source = "[dependencies]\nfoo = { path = \"../foo\", version = \"1.0.0\" }\n\n[package]\nname = \"x\"\nversion = \"1.0.0\"\n";
        let output = bump(Some(source), "package.version", Some("1.0.0"));
        assert_eq!(
            output,
            "[dependencies]\nfoo = { path = \"../foo\", version = \"1.0.0\" }\n\n[package]\nname = \"x\"\nversion = \"1.0.1\"\n"
        );
        assert_eq!(
            TomlParser::read_value(&output, "dependencies.foo.version").unwrap(),
            Some("1.0.0".to_string())
        );
    }

    #[test]
    fn test_structural_write_without_previous_version() {
        let source = "[project]\nname = \"foo\"\nversion = \"1.0.0\" # current\n# these are authors\nauthors = []\n";
        let output = bump(Some(source), "project.version", None);
        assert_eq!(output, source.replace("1.0.0", "1.0.1"));
    }

    #[test]
    fn test_structural_write_when_previous_is_stale() {
        let source = "[tool.test]\nversion = \"0.9.0\"\n";
        let output = bump(Some(source), "tool.test.version", Some("1.0.0"));
        assert_eq!(output, "[tool.test]\nversion = \"1.0.1\"\n");
    }

    #[test]
    fn test_write_creates_missing_tables() {
        let output = bump(None, "tool.test.version", None);
        assert_eq!(output, "[tool.test]\nversion = \"1.0.1\"\n");
        assert_eq!(
            TomlParser::read_value(&output, "tool.test.version").unwrap(),
            Some("1.0.1".to_string())
        );
    }

    #[test]
    fn test_write_preserves_crlf() {
        let source = "[package]\r\nname = \"x\"\r\nversion = \"1.0.0\"\r\n";
        assert_eq!(
            bump(Some(source), "package.version", Some("1.0.0")),
            "[package]\r\nname = \"x\"\r\nversion = \"1.0.1\"\r\n"
        );
        assert_eq!(
            bump(Some(source), "package.version", None),
            "[package]\r\nname = \"x\"\r\nversion = \"1.0.1\"\r\n"
        );
    }

    #[test]
    fn test_write_multiple_paths() {
        let source = "[package]\nversion = \"1.0.0\"\n\n[workspace.package]\nversion = \"1.0.0\"\n";
        let request = WriteRequest::new("package.version", "1.0.1")
            .with_paths(["package.version", "workspace.package.version"])
            .with_previous(Some("1.0.0"));
        let output = TomlParser::write_value(Some(source), &request).unwrap();
        assert_eq!(
            TomlParser::read_value(&output, "package.version").unwrap(),
            Some("1.0.1".to_string())
        );
        assert_eq!(
            TomlParser::read_value(&output, "workspace.package.version").unwrap(),
            Some("1.0.1".to_string())
        );
    }

    #[test]
    fn test_invalid_path() {
        let request = WriteRequest::new("package..version", "1.0.1");
        let err = TomlParser::write_value(Some("[package]\n"), &request).unwrap_err();
        assert!(matches!(err.downcast_ref::<BumperError>(), Some(BumperError::InvalidPath { .. })));
    }
}
