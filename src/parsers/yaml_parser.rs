use crate::formatting::{DEFAULT_INDENT, FormattingContext};
use crate::parsers::{Parser, StructuralWriter, WriteRequest};
use crate::path::{self, PathNode};
use anyhow::{Context, Result};
use regex::Regex;
use serde_yaml::Value;

pub struct YamlParser;

impl Parser for YamlParser {
    fn read_value(contents: &str, path: &str) -> Result<Option<String>> {
        let document = Self::parse_document(contents)?;
        Ok(path::lookup_text(&document, path))
    }

    fn write_value(contents: Option<&str>, request: &WriteRequest) -> Result<String> {
        Self::write_structural(contents, request)
    }
}

impl StructuralWriter for YamlParser {
    type Document = Value;

    fn parse_document(contents: &str) -> Result<Value> {
        serde_yaml::from_str(contents).context("Invalid YAML")
    }

    fn empty_document() -> Value {
        Value::empty_mapping()
    }

    fn set_value(document: &mut Value, path: &str, value: &str) -> Result<()> {
        path::assign(document, path, Value::from_text(value));
        Ok(())
    }

    fn serialize_document(document: &Value, formatting: &FormattingContext) -> Result<String> {
        let text = serde_yaml::to_string(document)?;
        let text = if formatting.uses_tabs() {
            text
        } else {
            reindent(&text, formatting.indent_width())?
        };
        Ok(formatting.newline.apply(&text))
    }
}

/// Scales the two-space indentation emitted by `serde_yaml` to `width` spaces per level.
///
/// Lines of a block scalar (`|`, `>-`, `|2` ...) are shifted by the same amount as their header
/// line so the indentation inside the string is unchanged.
fn reindent(text: &str, width: usize) -> Result<String> {
    let emitted = DEFAULT_INDENT.len();
    if width == emitted || width == 0 {
        return Ok(text.to_string());
    }
    let scale = |leading: usize| (leading / emitted) * width + leading % emitted;
    let block_header = Regex::new(r"(?:^|\s)[|>][0-9+-]*$")?;

    let mut output = String::with_capacity(text.len());
    let mut block_parent: Option<usize> = None;
    for line in text.split_inclusive('\n') {
        let content = line.trim_start_matches(' ');
        let leading = line.len() - content.len();
        let blank = content.trim_end().is_empty();

        if let Some(parent) = block_parent {
            if blank {
                output.push_str(line);
                continue;
            }
            if leading > parent {
                output.push_str(&" ".repeat(scale(parent) + leading - parent));
                output.push_str(content);
                continue;
            }
            block_parent = None;
        }

        output.push_str(&" ".repeat(scale(leading)));
        output.push_str(content);
        if block_header.is_match(content.trim_end()) {
            block_parent = Some(leading);
        }
    }
    Ok(output)
}
