use crate::parsers::{
    BumperError, MinimalDiffWriter, Parser, Splice, WriteRequest, escape_markup_text,
};
use crate::selector::Selector;
use anyhow::{Context, Result};
use roxmltree::{Document, Node, ParsingOptions};

/// XML documents addressed by CSS-style selectors.
///
/// Only the content of the matched element is rewritten, at its exact position in the source,
/// so declarations, comments, entities and line endings elsewhere are left byte for byte.
pub struct XmlParser;

impl XmlParser {
    fn parse_document(contents: &str) -> Result<Document<'_>> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        Document::parse_with_options(contents, options).context("Invalid XML")
    }

    fn find<'a, 'input>(document: &'a Document<'input>, path: &str) -> Result<Node<'a, 'input>> {
        let selector = Selector::parse(path)?;
        selector.select_first(document).ok_or_else(|| {
            BumperError::SelectorNotFound {
                selector: path.to_string(),
            }
            .into()
        })
    }

    fn text_content(node: Node) -> String {
        node.descendants()
            .filter(|descendant| descendant.is_text())
            .filter_map(|descendant| descendant.text())
            .collect()
    }

    /// The splice replacing every child of `node` with `text`.
    fn content_splice(contents: &str, node: Node, text: &str) -> Splice {
        if let (Some(first), Some(last)) = (node.first_child(), node.last_child()) {
            return Splice::new(first.range().start..last.range().end, text);
        }

        let range = node.range();
        let outer = &contents[range.clone()];
        if outer.ends_with("/>") {
            let name = outer
                .trim_start_matches('<')
                .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
                .next()
                .unwrap_or_default();
            Splice::new(range.end - 2..range.end, format!(">{text}</{name}>"))
        } else {
            let at = range.start + outer.rfind("</").unwrap_or(outer.len());
            Splice::new(at..at, text)
        }
    }
}

impl Parser for XmlParser {
    fn read_value(contents: &str, path: &str) -> Result<Option<String>> {
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let document = Self::parse_document(contents)?;
        let node = Self::find(&document, path)?;
        let text = Self::text_content(node);
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    fn write_value(contents: Option<&str>, request: &WriteRequest) -> Result<String> {
        Self::write_minimal(contents.unwrap_or_default(), request)
    }
}

impl MinimalDiffWriter for XmlParser {
    fn splices(contents: &str, request: &WriteRequest) -> Result<Vec<Splice>> {
        if contents.trim().is_empty() {
            let selector = request.paths.first().cloned().unwrap_or_default();
            return Err(BumperError::SelectorNotFound { selector }.into());
        }

        let document = Self::parse_document(contents)?;
        let text = escape_markup_text(&request.value);
        request
            .paths
            .iter()
            .map(|path| Ok(Self::content_splice(contents, Self::find(&document, path)?, &text)))
            .collect()
    }
}
