//! Function Span Detection
//!
//! Locates shell function definitions and their brace-matched extents.
//! Recognized header forms:
//! - `name() {`
//! - `function name() {`
//! - `function name {`
//!
//! The body end is found by counting braces line by line, with quoted
//! strings stripped first so braces inside `'…'` / `"…"` do not skew the
//! count. Comment lines are skipped. An unclosed function yields no span.

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::script::{Line, Script};

lazy_static! {
    static ref FUNC_KEYWORD: Regex =
        Regex::new(r"^\s*function\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\(\s*\)\s*)?\{").unwrap();
    static ref FUNC_PARENS: Regex =
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*\)\s*\{").unwrap();
    static ref SINGLE_QUOTED: Regex = Regex::new(r"'[^']*'").unwrap();
    static ref DOUBLE_QUOTED: Regex = Regex::new(r#""[^"]*""#).unwrap();
}

/// A function definition's location, lines 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpan {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl FunctionSpan {
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Parse a function header, returning the function name.
pub fn parse_function_header(text: &str) -> Option<String> {
    if let Some(caps) = FUNC_KEYWORD.captures(text) {
        return Some(caps[1].to_string());
    }
    FUNC_PARENS.captures(text).map(|caps| caps[1].to_string())
}

/// Brace delta of a line with quoted strings removed.
fn brace_delta(text: &str) -> i32 {
    let without_single = SINGLE_QUOTED.replace_all(text, "");
    let cleaned = DOUBLE_QUOTED.replace_all(&without_single, "");
    let opens = cleaned.matches('{').count() as i32;
    let closes = cleaned.matches('}').count() as i32;
    opens - closes
}

/// Find the closing-brace index for a function whose header sits at
/// `start` (an index into `lines`). Returns `None` when the body never
/// closes within the slice.
pub fn find_function_end_in(lines: &[Line], start: usize) -> Option<usize> {
    let header = lines.get(start)?;
    let mut depth = brace_delta(&header.text);
    if depth == 0 {
        // Single-line function, header and body on one line.
        return Some(start);
    }
    for (offset, line) in lines[start + 1..].iter().enumerate() {
        if line.is_comment() {
            continue;
        }
        depth += brace_delta(&line.text);
        if depth == 0 {
            return Some(start + 1 + offset);
        }
    }
    None
}

/// Find the closing-brace line for a function whose header is at
/// `start_line` (1-based). Returns `None` when the body never closes.
pub fn find_function_end(script: &Script, start_line: usize) -> Option<usize> {
    find_function_end_in(script.lines(), start_line.checked_sub(1)?)
        .map(|idx| script.lines()[idx].number)
}

/// All complete function definitions in the script.
pub fn find_functions(script: &Script) -> Vec<FunctionSpan> {
    let mut spans = Vec::new();
    for line in script.lines() {
        if let Some(name) = parse_function_header(&line.text) {
            if let Some(end_line) = find_function_end(script, line.number) {
                spans.push(FunctionSpan {
                    name,
                    start_line: line.number,
                    end_line,
                });
            }
        }
    }
    spans
}

/// Whether a function with the given name is defined anywhere in the
/// script.
pub fn is_defined_function(script: &Script, name: &str) -> bool {
    script
        .lines()
        .iter()
        .any(|l| parse_function_header(&l.text).as_deref() == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_forms() {
        assert_eq!(parse_function_header("greet() {"), Some("greet".into()));
        assert_eq!(
            parse_function_header("function greet() {"),
            Some("greet".into())
        );
        assert_eq!(
            parse_function_header("function greet {"),
            Some("greet".into())
        );
        assert_eq!(parse_function_header("  indented() {"), Some("indented".into()));
        assert_eq!(parse_function_header("greet()"), None);
        assert_eq!(parse_function_header("echo hi"), None);
    }

    #[test]
    fn test_find_function_end_matches_braces() {
        let script = Script::parse("greet() {\n  if true; then\n    echo hi\n  fi\n}\necho after\n");
        assert_eq!(find_function_end(&script, 1), Some(5));
    }

    #[test]
    fn test_braces_in_strings_ignored() {
        let script = Script::parse("f() {\n  echo '{'\n  echo \"}\"\n}\n");
        assert_eq!(find_function_end(&script, 1), Some(4));
    }

    #[test]
    fn test_comment_lines_skipped() {
        let script = Script::parse("f() {\n  # not a close: }\n  echo hi\n}\n");
        assert_eq!(find_function_end(&script, 1), Some(4));
    }

    #[test]
    fn test_unclosed_function_has_no_span() {
        let script = Script::parse("f() {\n  echo hi\n");
        assert_eq!(find_function_end(&script, 1), None);
        assert!(find_functions(&script).is_empty());
    }

    #[test]
    fn test_find_functions_collects_spans() {
        let script = Script::parse("a() {\n  echo a\n}\nfunction b {\n  echo b\n}\n");
        let spans = find_functions(&script);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "a");
        assert_eq!((spans[0].start_line, spans[0].end_line), (1, 3));
        assert_eq!(spans[1].name, "b");
        assert_eq!((spans[1].start_line, spans[1].end_line), (4, 6));
    }

    #[test]
    fn test_contains_covers_header_through_close() {
        let span = FunctionSpan {
            name: "f".into(),
            start_line: 2,
            end_line: 5,
        };
        assert!(!span.contains(1));
        assert!(span.contains(2));
        assert!(span.contains(5));
        assert!(!span.contains(6));
    }
}
