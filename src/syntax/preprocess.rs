//! Line classification.
//!
//! A document is split on newlines; every line is independently an
//! empty line, a markdown-style heading, or an expression. Expression
//! lines lose their trailing `#` comment and remember their byte
//! offset into the document so diagnostics can be made absolute.

/// How a raw line is classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Only whitespace.
    Empty,
    /// `#`-run at column 1 followed by whitespace; the level is the
    /// run length.
    Heading { level: u8 },
    /// Everything else; handed to the parser.
    Expression,
}

/// One preprocessed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    pub kind: LineKind,
    /// The expression text with any inline comment stripped; empty for
    /// non-expression lines.
    pub content: String,
    /// Byte offset of this line's content in the document.
    pub content_offset: usize,
}

/// Splits a document into classified lines. Accepts LF and CRLF.
#[must_use]
pub fn preprocess(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut offset = 0usize;
    for (idx, raw) in text.split('\n').enumerate() {
        let raw_len = raw.len();
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        lines.push(classify(idx + 1, raw, offset));
        offset += raw_len + 1;
    }
    // A trailing newline does not create a phantom line.
    if text.ends_with('\n') && lines.last().is_some_and(|l| l.kind == LineKind::Empty) {
        lines.pop();
    }
    lines
}

fn classify(number: usize, raw: &str, offset: usize) -> Line {
    if raw.trim().is_empty() {
        return Line {
            number,
            kind: LineKind::Empty,
            content: String::new(),
            content_offset: offset,
        };
    }

    let hashes = raw.chars().take_while(|&c| c == '#').count();
    if hashes > 0 {
        let rest = &raw[hashes..];
        if rest.starts_with(char::is_whitespace) && !rest.trim().is_empty() {
            return Line {
                number,
                kind: LineKind::Heading {
                    level: hashes.min(u8::MAX as usize) as u8,
                },
                content: String::new(),
                content_offset: offset,
            };
        }
    }

    // An inline `#` starts a comment. The grammar has no string
    // literals, so no literal context can contain one.
    let content = raw.split('#').next().unwrap_or(raw).trim_end();
    if content.trim().is_empty() {
        return Line {
            number,
            kind: LineKind::Empty,
            content: String::new(),
            content_offset: offset,
        };
    }
    Line {
        number,
        kind: LineKind::Expression,
        content: content.to_string(),
        content_offset: offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_empty_heading_expression() {
        let lines = preprocess("# Budget\n\n5 + 5\n## Sub\n   \n");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].kind, LineKind::Heading { level: 1 });
        assert_eq!(lines[1].kind, LineKind::Empty);
        assert_eq!(lines[2].kind, LineKind::Expression);
        assert_eq!(lines[2].content, "5 + 5");
        assert_eq!(lines[3].kind, LineKind::Heading { level: 2 });
        assert_eq!(lines[4].kind, LineKind::Empty);
    }

    #[test]
    fn strips_inline_comments() {
        let lines = preprocess("1 + 2 # the easy part");
        assert_eq!(lines[0].content, "1 + 2");
        // A line that is only a comment is empty.
        let lines = preprocess("#not a heading");
        assert_eq!(lines[0].kind, LineKind::Empty);
    }

    #[test]
    fn records_content_offsets() {
        let text = "a = 1\nb = a";
        let lines = preprocess(text);
        assert_eq!(lines[0].content_offset, 0);
        assert_eq!(lines[1].content_offset, 6);
        assert_eq!(&text[lines[1].content_offset..], "b = a");
    }

    #[test]
    fn handles_crlf() {
        let lines = preprocess("1 + 1\r\n2 + 2\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content, "1 + 1");
        assert_eq!(lines[1].content, "2 + 2");
    }
}
