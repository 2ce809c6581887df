use crate::formatting::Newline;
use crate::parsers::{
    BumperError, MinimalDiffWriter, Parser, Splice, WriteRequest, escape_markup_text,
};
use anyhow::Result;
use scraper::{ElementRef, Html, Selector};

/// HTML and XHTML documents addressed by CSS selectors.
///
/// The document is never serialized as a whole. The matched element is serialized before and
/// after its text changes, and the first occurrence of the former in the raw source is swapped
/// for the latter. Markup written differently from that serialization, such as single-quoted
/// attributes or upper-case tag names, is not found and fails with `MarkupNotLocated`.
pub struct HtmlParser;

impl HtmlParser {
    fn selector(path: &str) -> Result<Selector> {
        Selector::parse(path).map_err(|e| {
            BumperError::InvalidSelector {
                selector: path.to_string(),
                reason: format!("{e:?}"),
            }
            .into()
        })
    }

    fn find<'a>(document: &'a Html, path: &str) -> Result<ElementRef<'a>> {
        let selector = Self::selector(path)?;
        document.select(&selector).next().ok_or_else(|| {
            BumperError::SelectorNotFound {
                selector: path.to_string(),
            }
            .into()
        })
    }

    /// Outer markup of `element` with its content replaced by `text`.
    fn replace_content(element: ElementRef, text: &str, path: &str) -> Result<(String, String)> {
        let before = element.html();
        let inner = element.inner_html();
        let closing = format!("</{}>", element.value().name());
        let opening_end = before
            .strip_suffix(closing.as_str())
            .and_then(|without_closing| without_closing.strip_suffix(inner.as_str()))
            .map(str::len)
            .ok_or_else(|| BumperError::MarkupNotLocated {
                selector: path.to_string(),
            })?;
        let after = format!("{}{}{}", &before[..opening_end], text, closing);
        Ok((before, after))
    }
}

impl Parser for HtmlParser {
    fn read_value(contents: &str, path: &str) -> Result<Option<String>> {
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let document = Html::parse_document(contents);
        let element = Self::find(&document, path)?;
        let text = element.text().collect::<String>();
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    fn write_value(contents: Option<&str>, request: &WriteRequest) -> Result<String> {
        Self::write_minimal(contents.unwrap_or_default(), request)
    }
}

impl MinimalDiffWriter for HtmlParser {
    fn splices(contents: &str, request: &WriteRequest) -> Result<Vec<Splice>> {
        let document = Html::parse_document(contents);
        // The parser normalizes line breaks, the raw source may not have.
        let newline = Newline::detect(contents);
        let text = escape_markup_text(&request.value);

        let mut splices = Vec::with_capacity(request.paths.len());
        for path in &request.paths {
            let element = Self::find(&document, path)?;
            let (before, after) = Self::replace_content(element, &text, path)?;
            let (before, after) = (newline.apply(&before), newline.apply(&after));
            let start = contents
                .find(before.as_str())
                .ok_or_else(|| BumperError::MarkupNotLocated {
                    selector: path.to_string(),
                })?;
            splices.push(Splice::new(start..start + before.len(), after));
        }
        Ok(splices)
    }
}
