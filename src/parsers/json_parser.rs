use crate::formatting::FormattingContext;
use crate::parsers::{Parser, StructuralWriter, WriteRequest};
use crate::path::{self, PathNode};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

pub struct JsonParser;

impl Parser for JsonParser {
    fn read_value(contents: &str, path: &str) -> Result<Option<String>> {
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let document = Self::parse_document(contents)?;
        Ok(path::lookup_text(&document, path))
    }

    fn write_value(contents: Option<&str>, request: &WriteRequest) -> Result<String> {
        Self::write_structural(contents, request)
    }
}

impl StructuralWriter for JsonParser {
    type Document = Value;

    fn parse_document(contents: &str) -> Result<Value> {
        serde_json::from_str(contents).context("Invalid JSON")
    }

    fn empty_document() -> Value {
        Value::empty_mapping()
    }

    fn set_value(document: &mut Value, path: &str, value: &str) -> Result<()> {
        path::assign(document, path, Value::from_text(value));
        Ok(())
    }

    fn serialize_document(document: &Value, formatting: &FormattingContext) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(formatting.indent.as_bytes());
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        document.serialize(&mut serializer)?;

        let mut text = String::from_utf8(buffer)?;
        text.push('\n');
        Ok(formatting.newline.apply(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_top_level_version() {
        let value = JsonParser::read_value(r#"{"version":"1.0.0"}"#, "version").unwrap();
        assert_eq!(value, Some("1.0.0".to_string()));
    }

    #[test]
    fn test_read_missing_value() {
        assert_eq!(JsonParser::read_value("{}", "version").unwrap(), None);
        assert_eq!(JsonParser::read_value("", "version").unwrap(), None);
    }

    #[test]
    fn test_read_invalid_json_fails() {
        assert!(JsonParser::read_value("{ not json", "version").is_err());
    }

    #[test]
    fn test_write_unindented_source_uses_default_indent() {
        let output = JsonParser::write_value(
            Some("{\"version\":\"1.0.0\"}\n"),
            &WriteRequest::new("version", "1.0.1"),
        )
        .unwrap();
        assert_eq!(output, "{\n  \"version\": \"1.0.1\"\n}\n");
    }

    #[test]
    fn test_write_preserves_indent_and_key_order() {
        let source = "{\n    \"name\": \"pkg\",\n    \"version\": \"1.0.0\",\n    \"private\": true\n}";
        let output = JsonParser::write_value(Some(source), &WriteRequest::new("version", "2.0.0")).unwrap();
        assert_eq!(
            output,
            "{\n    \"name\": \"pkg\",\n    \"version\": \"2.0.0\",\n    \"private\": true\n}\n"
        );
    }

    #[test]
    fn test_write_preserves_tabs_and_crlf() {
        let source = "{\r\n\t\"version\": \"1.0.0\"\r\n}\r\n";
        let output = JsonParser::write_value(Some(source), &WriteRequest::new("version", "1.0.1")).unwrap();
        assert_eq!(output, "{\r\n\t\"version\": \"1.0.1\"\r\n}\r\n");
    }

    #[test]
    fn test_write_new_file() {
        let output = JsonParser::write_value(None, &WriteRequest::new("version", "0.0.0")).unwrap();
        assert_eq!(output, "{\n  \"version\": \"0.0.0\"\n}\n");
    }

    #[test]
    fn test_write_nested_path() {
        let output = JsonParser::write_value(Some("{}\n"), &WriteRequest::new("deep.sub.version", "1.2.3")).unwrap();
        assert_eq!(
            output,
            "{\n  \"deep\": {\n    \"sub\": {\n      \"version\": \"1.2.3\"\n    }\n  }\n}\n"
        );
    }

    #[test]
    fn test_write_multiple_paths() {
        let request = WriteRequest::new("version", "1.2.3").with_paths(["version", "deep.version", "deep.sub.version"]);
        let output = JsonParser::write_value(None, &request).unwrap();
        assert_eq!(
            output,
            "{\n  \"version\": \"1.2.3\",\n  \"deep\": {\n    \"version\": \"1.2.3\",\n    \"sub\": {\n      \"version\": \"1.2.3\"\n    }\n  }\n}\n"
        );
    }

    #[test]
    fn test_write_with_prefix_round_trips() {
        let output = JsonParser::write_value(Some("{}"), &WriteRequest::new("version", "^1.0.1")).unwrap();
        assert_eq!(JsonParser::read_value(&output, "version").unwrap(), Some("^1.0.1".to_string()));
    }
}
