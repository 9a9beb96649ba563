//! Line-oriented cursor over the chart source.

/// Walks the source line by line, yielding trimmed content together with its
/// byte span. Handles `\n`, `\r\n` and bare `\r` terminators.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    index: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `source`.
    #[must_use]
    pub const fn new(source: &'a str) -> Self {
        Self {
            source,
            index: 0,
            line: 0,
        }
    }

    /// Whether the whole source has been consumed.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.index >= self.source.len()
    }

    /// 1-based number of the most recently yielded line.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Consumes and returns the next line, trimmed, with the byte span of the
    /// trimmed content. Returns `None` at the end of the source.
    pub fn next_line(&mut self) -> Option<(std::ops::Range<usize>, &'a str)> {
        if self.is_end() {
            return None;
        }
        let rest = &self.source[self.index..];
        let (line_len, terminator_len) = match rest.find(['\n', '\r']) {
            Some(position) => {
                let terminator = if rest[position..].starts_with("\r\n") {
                    2
                } else {
                    1
                };
                (position, terminator)
            }
            None => (rest.len(), 0),
        };
        let start = self.index;
        let raw = &rest[..line_len];
        self.index += line_len + terminator_len;
        self.line += 1;

        let leading = raw.len() - raw.trim_start().len();
        let trimmed = raw.trim();
        let span_start = start + leading;
        Some((span_start..span_start + trimmed.len(), trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_trimmed_lines_with_spans() {
        let mut cursor = Cursor::new("#TITLE:x;\n  0000  \nlast");
        let (span, line) = cursor.next_line().expect("first line");
        assert_eq!(line, "#TITLE:x;");
        assert_eq!(span, 0..9);
        let (span, line) = cursor.next_line().expect("second line");
        assert_eq!(line, "0000");
        assert_eq!(span, 12..16);
        let (_, line) = cursor.next_line().expect("third line");
        assert_eq!(line, "last");
        assert!(cursor.next_line().is_none());
        assert!(cursor.is_end());
    }

    #[test]
    fn handles_crlf_and_bare_cr() {
        let mut cursor = Cursor::new("a\r\nb\rc\n");
        assert_eq!(cursor.next_line().map(|(_, l)| l), Some("a"));
        assert_eq!(cursor.next_line().map(|(_, l)| l), Some("b"));
        assert_eq!(cursor.next_line().map(|(_, l)| l), Some("c"));
        assert_eq!(cursor.next_line(), None);
        assert_eq!(cursor.line(), 3);
    }

    #[test]
    fn empty_lines_have_empty_spans() {
        let mut cursor = Cursor::new("\n\nx");
        let (span, line) = cursor.next_line().expect("blank");
        assert_eq!(line, "");
        assert!(span.is_empty());
        let _ = cursor.next_line();
        assert_eq!(cursor.next_line().map(|(_, l)| l), Some("x"));
    }
}
