/// The input script as an ordered list of lines. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        let trailing_newline = text.ends_with('\n');
        let body = text.strip_suffix('\n').unwrap_or(text);

        let lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split('\n').map(|l| strip_cr(l).to_string()).collect()
        };

        Self {
            lines,
            trailing_newline,
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            trailing_newline: true,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Joins `lines` back into text the way this document was laid out.
    pub fn render(&self, lines: &[String], eol: &str) -> String {
        let mut out = lines.join(eol);
        if self.trailing_newline && !lines.is_empty() {
            out.push_str(eol);
        }
        out
    }
}

pub(crate) fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_carriage_returns() {
        let doc = Document::parse("a\r\nb\r\n");

        assert_eq!(doc.lines(), ["a", "b"]);
        assert_eq!(doc.render(doc.lines(), "\n"), "a\nb\n");
    }

    #[test]
    fn test_parse_without_trailing_newline() {
        let doc = Document::parse("a\n\nb");

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.lines()[1], "");
        assert_eq!(doc.render(doc.lines(), "\n"), "a\n\nb");
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::parse("");

        assert!(doc.is_empty());
        assert_eq!(doc.render(doc.lines(), "\n"), "");
    }

    #[test]
    fn test_render_with_crlf() {
        let doc = Document::parse("x\ny\n");
        assert_eq!(doc.render(doc.lines(), "\r\n"), "x\r\ny\r\n");
    }
}
