use crate::formatting::FormattingContext;
use crate::parsers::{Parser, StructuralWriter, WriteRequest};
use crate::path::{self, PathNode};
use anyhow::{Result, bail};
use serde_json::{Map, Value};

/// INI and `.properties` style files.
///
/// Documents are held as a mapping: keys outside any section at the top level, and one nested
/// mapping per `[section]`. Comments are not carried over when the file is written back.
pub struct IniParser;

impl IniParser {
    fn unquote(value: &str) -> &str {
        let value = value.trim();
        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return &value[1..value.len() - 1];
            }
        }
        value
    }

    fn quote(value: &str) -> String {
        if value.trim() != value || value.starts_with(['"', '\'']) {
            format!("\"{value}\"")
        } else {
            value.to_string()
        }
    }

    fn insert(target: &mut Map<String, Value>, key: &str, value: &str) {
        match key.strip_suffix("[]") {
            Some(key) => {
                let entry = target
                    .entry(key.trim_end().to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !entry.is_array() {
                    *entry = Value::Array(Vec::new());
                }
                if let Value::Array(items) = entry {
                    items.push(Value::from_text(value));
                }
            }
            None => {
                target.insert(key.to_string(), Value::from_text(value));
            }
        }
    }

    fn write_entries(output: &mut String, entries: &Map<String, Value>) {
        for (key, value) in entries {
            match value {
                Value::Object(_) => {}
                Value::Array(items) => {
                    for item in items {
                        let text = item.scalar_text().unwrap_or_default();
                        output.push_str(&format!("{key}[]={}\n", Self::quote(&text)));
                    }
                }
                other => {
                    let text = other.scalar_text().unwrap_or_default();
                    output.push_str(&format!("{key}={}\n", Self::quote(&text)));
                }
            }
        }
    }

    fn write_sections(output: &mut String, prefix: Option<&str>, entries: &Map<String, Value>) {
        for (key, value) in entries {
            let Value::Object(section) = value else {
                continue;
            };
            let name = match prefix {
                Some(prefix) => format!("{prefix}.{key}"),
                None => key.clone(),
            };
            let has_entries = section.values().any(|value| !value.is_object());
            if has_entries || section.is_empty() {
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(&format!("[{name}]\n"));
                Self::write_entries(output, section);
            }
            Self::write_sections(output, Some(&name), section);
        }
    }
}

impl Parser for IniParser {
    fn read_value(contents: &str, path: &str) -> Result<Option<String>> {
        let document = Self::parse_document(contents)?;
        Ok(path::lookup_text(&document, path))
    }

    fn write_value(contents: Option<&str>, request: &WriteRequest) -> Result<String> {
        Self::write_structural(contents, request)
    }
}

impl StructuralWriter for IniParser {
    type Document = Value;

    fn parse_document(contents: &str) -> Result<Value> {
        let mut root = Map::new();
        let mut section: Option<String> = None;

        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    bail!("Invalid INI: unterminated section header on line {}", index + 1);
                };
                let name = name.trim().to_string();
                let entry = root.entry(name.clone()).or_insert_with(Value::empty_mapping);
                if !entry.is_object() {
                    *entry = Value::empty_mapping();
                }
                section = Some(name);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                bail!("Invalid INI: expected 'key=value' on line {}", index + 1);
            };
            let key = key.trim();
            if key.is_empty() {
                bail!("Invalid INI: empty key on line {}", index + 1);
            }

            let target = match &section {
                Some(name) => root.get_mut(name).and_then(Value::as_object_mut),
                None => Some(&mut root),
            };
            if let Some(target) = target {
                Self::insert(target, key, Self::unquote(value));
            }
        }

        Ok(Value::Object(root))
    }

    fn empty_document() -> Value {
        Value::empty_mapping()
    }

    fn set_value(document: &mut Value, path: &str, value: &str) -> Result<()> {
        path::assign(document, path, Value::from_text(value));
        Ok(())
    }

    fn serialize_document(document: &Value, formatting: &FormattingContext) -> Result<String> {
        let mut output = String::new();
        if let Some(entries) = document.as_object() {
            Self::write_entries(&mut output, entries);
            Self::write_sections(&mut output, None, entries);
        }
        Ok(formatting.newline.apply(&output))
    }
}
