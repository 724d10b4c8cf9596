//! Source positions inside a filter string.

/// A byte range in the filter source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`, used for "unexpected end of input".
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Smallest span covering both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 1-based column of the span start within `source`.
    pub fn column(&self, source: &str) -> usize {
        offset_to_line_col(source, self.start).1
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span {
            start: range.start,
            end: range.end,
        }
    }
}

/// Convert a byte offset to a 1-based line/column pair.
pub fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }

        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Render `source` with a caret line under `span`.
pub(crate) fn render_caret(source: &str, span: Span, message: &str) -> String {
    let (line, col) = offset_to_line_col(source, span.start);
    let mut out = format!("error: {message}\n  --> column {col}\n");

    if let Some(source_line) = source.lines().nth(line - 1) {
        out.push_str(&format!("   |\n   | {source_line}\n   | "));
        out.push_str(&" ".repeat(col - 1));
        out.push('^');
        let width = span.len().min(source_line.len().saturating_sub(col - 1));
        if width > 1 {
            out.push_str(&"~".repeat(width - 1));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column() {
        let source = "(Name eq 'x')";
        assert_eq!(Span::new(0, 1).column(source), 1);
        assert_eq!(Span::new(6, 8).column(source), 7);
    }

    #[test]
    fn test_render_caret() {
        let rendered = render_caret("(A xx 1)", Span::new(2, 6), "unknown operator");
        assert!(rendered.contains("column 3"));
        assert!(rendered.contains("   |   ^~~~"));
    }
}
