//! Script Line Model
//!
//! A [`Script`] is an immutable, ordered sequence of lines with 1-based
//! numbering and precomputed leading-whitespace widths. The input text is
//! never mutated; every transformation reads one `Script` and produces a
//! new one. Trailing-newline presence is preserved across the round trip.

/// One line of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// The line text without its terminating newline.
    pub text: String,
    /// 1-based line number in the owning script.
    pub number: usize,
    /// Width of the leading whitespace, counting tabs as single columns.
    pub indent: usize,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_comment(&self) -> bool {
        self.text.trim_start().starts_with('#')
    }

    /// The comment body after `#`, trimmed, for comment lines.
    pub fn comment_body(&self) -> Option<&str> {
        let trimmed = self.text.trim_start();
        trimmed.strip_prefix('#').map(str::trim)
    }
}

/// An immutable view of a script as numbered lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl Script {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .split('\n')
            .enumerate()
            .map(|(i, raw)| Line {
                text: raw.to_string(),
                number: i + 1,
                indent: indent_width(raw),
            })
            .collect::<Vec<_>>();
        // split('\n') on "a\n" yields ["a", ""]; drop the phantom line and
        // remember the newline instead.
        let trailing_newline = text.ends_with('\n');
        let lines = if trailing_newline {
            lines[..lines.len() - 1].to_vec()
        } else {
            lines
        };
        Self {
            lines,
            trailing_newline,
        }
    }

    /// Rebuild a script from already-transformed line texts, renumbering
    /// from 1 and keeping the original trailing-newline behavior.
    pub fn from_lines(texts: Vec<String>, trailing_newline: bool) -> Self {
        let lines = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Line {
                indent: indent_width(&text),
                number: i + 1,
                text,
            })
            .collect();
        Self {
            lines,
            trailing_newline,
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line by 1-based number.
    pub fn line(&self, number: usize) -> Option<&Line> {
        self.lines.get(number.checked_sub(1)?)
    }

    pub fn has_trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// The shebang line text, when the first line starts with `#!`.
    pub fn shebang(&self) -> Option<&str> {
        self.lines
            .first()
            .filter(|l| l.text.starts_with("#!"))
            .map(|l| l.text.as_str())
    }

    pub fn text(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}

/// Leading-whitespace width of a line, tabs counted as one column each.
pub fn indent_width(text: &str) -> usize {
    text.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// The leading whitespace itself, for re-indenting generated code.
pub fn leading_whitespace(text: &str) -> &str {
    let end = text.len() - text.trim_start_matches([' ', '\t']).len();
    &text[..end]
}
