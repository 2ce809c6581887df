use std::collections::HashMap;

/// Indentation applied when the source has none to detect.
pub const DEFAULT_INDENT: &str = "  ";

/// Line ending convention of a file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Newline {
    #[default]
    Lf,
    CrLf,
}

impl Newline {
    /// Picks whichever convention the majority of line breaks in `text` use.
    pub fn detect(text: &str) -> Self {
        let crlf = text.matches("\r\n").count();
        let lf = text.matches('\n').count() - crlf;
        if crlf > lf { Newline::CrLf } else { Newline::Lf }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::CrLf => "\r\n",
        }
    }

    /// Rewrites every line break in `text` to this convention.
    pub fn apply(&self, text: &str) -> String {
        let normalized = text.replace("\r\n", "\n");
        match self {
            Newline::Lf => normalized,
            Newline::CrLf => normalized.replace('\n', "\r\n"),
        }
    }
}

/// Formatting conventions observed in a source file, reapplied when it is serialized again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingContext {
    pub indent: String,
    pub newline: Newline,
}

impl Default for FormattingContext {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT.to_string(),
            newline: Newline::Lf,
        }
    }
}

impl FormattingContext {
    pub fn detect(text: &str) -> Self {
        Self {
            indent: detect_indent(text).unwrap_or_else(|| DEFAULT_INDENT.to_string()),
            newline: Newline::detect(text),
        }
    }

    /// Width of one indentation level in columns, tabs counting as one.
    pub fn indent_width(&self) -> usize {
        self.indent.chars().count()
    }

    pub fn uses_tabs(&self) -> bool {
        self.indent.starts_with('\t')
    }
}

/// Detects the indentation unit of `text`.
///
/// Looks at the change in leading whitespace between consecutive non-blank lines and returns
/// the most frequent step, or a tab when tab-indented lines dominate. Returns `None` when no
/// line is indented.
pub fn detect_indent(text: &str) -> Option<String> {
    let mut steps: HashMap<usize, usize> = HashMap::new();
    let mut tab_lines = 0usize;
    let mut space_lines = 0usize;
    let mut previous = 0usize;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with('\t') {
            tab_lines += 1;
            continue;
        }
        let current = line.len() - line.trim_start_matches(' ').len();
        if current > 0 {
            space_lines += 1;
        }
        if current != previous {
            *steps.entry(current.abs_diff(previous)).or_default() += 1;
        }
        previous = current;
    }

    if tab_lines > 0 && tab_lines >= space_lines {
        return Some("\t".to_string());
    }

    steps
        .into_iter()
        // Ties go to the narrower step so that results are stable.
        .max_by(|(a_width, a_count), (b_width, b_count)| a_count.cmp(b_count).then(b_width.cmp(a_width)))
        .map(|(width, _)| " ".repeat(width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_two_spaces() {
        let text = "{\n  \"name\": \"x\",\n  \"deep\": {\n    \"version\": \"1.0.0\"\n  }\n}\n";
        assert_eq!(detect_indent(text), Some("  ".to_string()));
    }

    #[test]
    fn test_detect_four_spaces() {
        let text = "{\n    \"a\": {\n        \"b\": 1\n    }\n}";
        assert_eq!(detect_indent(text), Some("    ".to_string()));
    }

    #[test]
    fn test_detect_tabs() {
        let text = "<project>\n\t<version>1.0.0</version>\n\t<dependencies>\n\t\t<dependency/>\n\t</dependencies>\n</project>\n";
        assert_eq!(detect_indent(text), Some("\t".to_string()));
    }

    #[test]
    fn test_detect_none_for_flat_text() {
        assert_eq!(detect_indent("{\"version\":\"1.0.0\"}\n"), None);
        assert_eq!(detect_indent(""), None);
    }

    #[test]
    fn test_context_defaults_when_undetectable() {
        let context = FormattingContext::detect("{}\n");
        assert_eq!(context, FormattingContext::default());
        assert_eq!(context.indent_width(), 2);
    }

    #[test]
    fn test_newline_detection() {
        assert_eq!(Newline::detect("a\nb\n"), Newline::Lf);
        assert_eq!(Newline::detect("a\r\nb\r\n"), Newline::CrLf);
        assert_eq!(Newline::detect("no line break"), Newline::Lf);
    }

    #[test]
    fn test_newline_apply() {
        assert_eq!(Newline::CrLf.apply("a\nb\r\nc\n"), "a\r\nb\r\nc\r\n");
        assert_eq!(Newline::Lf.apply("a\r\nb\r\n"), "a\nb\n");
    }
}
