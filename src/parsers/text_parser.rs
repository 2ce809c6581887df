use crate::formatting::Newline;
use crate::parsers::{MinimalDiffWriter, Parser, Splice, WriteRequest, parse_version};
use anyhow::Result;
use log::warn;

pub struct TextParser;

impl Parser for TextParser {
    /// The whole file is the value, `path` is ignored.
    fn read_value(contents: &str, _path: &str) -> Result<Option<String>> {
        let trimmed = contents.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }

    fn write_value(contents: Option<&str>, request: &WriteRequest) -> Result<String> {
        Self::write_minimal(contents.unwrap_or_default(), request)
    }
}

impl MinimalDiffWriter for TextParser {
    fn splices(contents: &str, request: &WriteRequest) -> Result<Vec<Splice>> {
        if request.consume_whole_file || contents.trim().is_empty() {
            let replacement = format!("{}{}", request.value, Newline::detect(contents).as_str());
            return Ok(vec![Splice::new(0..contents.len(), replacement)]);
        }

        // Without a known previous version, a file holding nothing but a version is its own.
        let previous = request
            .previous
            .clone()
            .or_else(|| parse_version(contents).map(|version| version.to_string()))
            .filter(|previous| !previous.is_empty());
        let Some(previous) = previous else {
            warn!("No previous version known, leaving text content unchanged");
            return Ok(Vec::new());
        };

        Ok(contents
            .match_indices(previous.as_str())
            .map(|(start, found)| Splice::new(start..start + found.len(), request.value.clone()))
            .collect())
    }
}
