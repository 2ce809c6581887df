use crate::formatting::FormattingContext;
use anyhow::{Context, Result};
use log::{debug, info};
use semver::Version;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

pub mod html_parser;
pub mod ini_parser;
pub mod json_parser;
pub mod text_parser;
pub mod toml_parser;
pub mod xml_parser;
pub mod yaml_parser;

#[derive(Debug, Error)]
pub enum BumperError {
    #[error("No element matches selector '{selector}'")]
    SelectorNotFound { selector: String },
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("Element matched by '{selector}' could not be located in the source text")]
    MarkupNotLocated { selector: String },
    #[error("Invalid path '{path}'")]
    InvalidPath { path: String },
    #[error("{failed} of {total} target(s) failed")]
    TargetsFailed { failed: usize, total: usize },
}

/// Everything a parser needs to rewrite the version of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Paths or selectors to write, all of them receive `value`.
    pub paths: Vec<String>,
    /// The new version with any configured prefix already applied.
    pub value: String,
    /// The version being replaced, used to scope text level substitutions.
    pub previous: Option<String>,
    /// Plain text only: replace the whole file instead of substituting within it.
    pub consume_whole_file: bool,
}

impl WriteRequest {
    pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            value: value.into(),
            previous: None,
            consume_whole_file: false,
        }
    }

    pub fn with_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_previous(mut self, previous: Option<impl Into<String>>) -> Self {
        self.previous = previous.map(Into::into);
        self
    }

    pub fn consume_whole_file(mut self, consume: bool) -> Self {
        self.consume_whole_file = consume;
        self
    }
}

/// A format handler: reads a value out of file contents and produces rewritten contents.
pub trait Parser {
    /// Returns the raw value addressed by `path`, or `None` when there is none.
    fn read_value(contents: &str, path: &str) -> Result<Option<String>>;

    /// Returns the new file contents. `contents` is `None` when the file does not exist yet.
    fn write_value(contents: Option<&str>, request: &WriteRequest) -> Result<String>;

    /// Reads the version stored in `file` at `path`.
    ///
    /// A missing file, a missing value, or a value that is not a valid version all yield `None`.
    fn get_current_version(file: impl AsRef<Path>, path: &str) -> Result<Option<Version>> {
        let file = file.as_ref();
        let Some(contents) = read_optional(file)? else {
            debug!("'{}' does not exist, no version to read", file.display());
            return Ok(None);
        };

        let raw = Self::read_value(&contents, path)
            .with_context(|| format!("Failed to read '{}' from {}", path, file.display()))?;
        let version = raw.as_deref().and_then(parse_version);
        match &version {
            Some(version) => debug!("Found current version {} in '{}'", version, file.display()),
            None => debug!("No valid version at '{}' in '{}' (found {:?})", path, file.display(), raw),
        }
        Ok(version)
    }

    /// Rewrites the version in `file`, creating the file when it does not exist.
    ///
    /// Returns whether the contents changed. Under `dry_run` the new contents are still computed,
    /// so lookup failures surface, but nothing is written.
    fn update_version(file: impl AsRef<Path>, request: &WriteRequest, dry_run: bool) -> Result<bool> {
        let file = file.as_ref();
        debug!("Checking file: '{}'", file.display());
        let contents = read_optional(file)?;
        let new_contents = Self::write_value(contents.as_deref(), request)
            .with_context(|| format!("Failed to update version in {}", file.display()))?;

        if contents.as_deref() == Some(new_contents.as_str()) {
            debug!("'{}' already up to date", file.display());
            return Ok(false);
        }
        if dry_run {
            info!("[dry-run] Would write version {} to '{}'", request.value, file.display());
            return Ok(true);
        }

        std::fs::write(file, new_contents).with_context(|| format!("Failed to write {}", file.display()))?;
        info!("Updated '{}' to {}", file.display(), request.value);
        Ok(true)
    }
}

/// Formats whose documents survive a full parse, edit and serialize cycle.
pub trait StructuralWriter {
    type Document;

    fn parse_document(contents: &str) -> Result<Self::Document>;
    fn empty_document() -> Self::Document;
    fn set_value(document: &mut Self::Document, path: &str, value: &str) -> Result<()>;
    fn serialize_document(document: &Self::Document, formatting: &FormattingContext) -> Result<String>;

    fn write_structural(contents: Option<&str>, request: &WriteRequest) -> Result<String> {
        let (mut document, formatting) = match contents {
            Some(contents) if !contents.trim().is_empty() => {
                (Self::parse_document(contents)?, FormattingContext::detect(contents))
            }
            Some(contents) => (Self::empty_document(), FormattingContext::detect(contents)),
            None => (Self::empty_document(), FormattingContext::default()),
        };
        for path in &request.paths {
            Self::set_value(&mut document, path, &request.value)?;
        }
        Self::serialize_document(&document, &formatting)
    }
}

/// Replacement of one byte range of a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub span: Range<usize>,
    pub replacement: String,
}

impl Splice {
    pub fn new(span: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }
}

/// Formats that are rewritten by replacing only the bytes holding the old value.
pub trait MinimalDiffWriter {
    /// Locates the spans to replace in `contents`.
    fn splices(contents: &str, request: &WriteRequest) -> Result<Vec<Splice>>;

    fn write_minimal(contents: &str, request: &WriteRequest) -> Result<String> {
        Ok(apply_splices(contents, Self::splices(contents, request)?))
    }
}

/// Applies `splices` to `original`, leaving every other byte untouched.
///
/// Splices overlapping or repeating an earlier one are ignored.
pub fn apply_splices(original: &str, mut splices: Vec<Splice>) -> String {
    splices.sort_by_key(|splice| (splice.span.start, splice.span.end));
    let mut output = String::with_capacity(original.len());
    let mut cursor = 0;
    let mut previous: Option<Range<usize>> = None;
    for splice in splices {
        if splice.span.start < cursor
            || splice.span.end > original.len()
            || previous.as_ref() == Some(&splice.span)
        {
            continue;
        }
        output.push_str(&original[cursor..splice.span.start]);
        output.push_str(&splice.replacement);
        cursor = splice.span.end;
        previous = Some(splice.span);
    }
    output.push_str(&original[cursor..]);
    output
}

/// Parses a version as found in a file, tolerating surrounding whitespace and a `v` or `=` prefix.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix(['v', 'V', '='])
        .unwrap_or(trimmed)
        .trim_start();
    Version::parse(stripped).ok()
}

/// Reads `file` to a string, mapping a missing file to `None`.
pub fn read_optional(file: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(file) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", file.display())),
    }
}

/// Escapes text for use as element content in XML or HTML.
pub(crate) fn escape_markup_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
