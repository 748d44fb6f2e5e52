//! Variable Reference Scanner
//!
//! Char-level scan for `$NAME`, `${NAME…}`, positional parameters and the
//! vararg collectors. The scan is deliberately forgiving: an unmatched
//! `${` is literal text, garbled positional syntax is skipped, and
//! nothing here ever fails. Quoting is not modeled; the classifier wants
//! every textual reference, comments included (a macro comment's source
//! expression must surface its variable on the CLI).

/// The syntactic form a variable reference used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceForm {
    /// `$NAME`
    Plain,
    /// `${NAME}` / `${NAME:-…}` etc.
    Braced,
}

/// What a `$…` occurrence refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    Variable { name: String, form: ReferenceForm },
    /// `$1`..`$9` or `${N}`.
    Positional(u32),
    /// `$@` or `$*`.
    Vararg,
}

/// One reference occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// 1-based line number.
    pub line: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Scan one line for references.
pub fn scan_line(text: &str, line: usize) -> Vec<Reference> {
    let chars: Vec<char> = text.chars().collect();
    let mut refs = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '$' {
            i += 1;
            continue;
        }
        // `\$` is an escaped, literal dollar.
        if i > 0 && chars[i - 1] == '\\' {
            i += 1;
            continue;
        }
        let Some(&next) = chars.get(i + 1) else { break };

        match next {
            '{' => {
                // Find the closing brace; none before end of line means
                // the `${` is literal text.
                let Some(close) = chars[i + 2..].iter().position(|c| *c == '}') else {
                    i += 2;
                    continue;
                };
                let inner: String = chars[i + 2..i + 2 + close].iter().collect();
                if let Some(kind) = classify_braced(&inner) {
                    refs.push(Reference { kind, line });
                }
                i += 2 + close + 1;
            }
            '@' | '*' => {
                refs.push(Reference {
                    kind: ReferenceKind::Vararg,
                    line,
                });
                i += 2;
            }
            '1'..='9' => {
                // Plain positionals are single-digit: `$10` is `${1}0`.
                refs.push(Reference {
                    kind: ReferenceKind::Positional(next as u32 - '0' as u32),
                    line,
                });
                i += 2;
            }
            c if is_name_start(c) => {
                let mut end = i + 2;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[i + 1..end].iter().collect();
                refs.push(Reference {
                    kind: ReferenceKind::Variable {
                        name,
                        form: ReferenceForm::Plain,
                    },
                    line,
                });
                i = end;
            }
            // $?, $#, $$, $!, $0, $(, $- and friends are not CLI-relevant.
            _ => {
                i += 2;
            }
        }
    }

    refs
}

/// Classify the content of a `${…}` expansion. Returns `None` for special
/// parameters and garbled content.
fn classify_braced(inner: &str) -> Option<ReferenceKind> {
    let mut chars = inner.chars();
    let first = chars.next()?;

    if first.is_ascii_digit() {
        // `${N}` positional; anything after the digits (like `${1:-x}`)
        // still names positional N.
        let digits: String = inner.chars().take_while(|c| c.is_ascii_digit()).collect();
        let index: u32 = digits.parse().ok()?;
        if index == 0 {
            return None;
        }
        return Some(ReferenceKind::Positional(index));
    }

    if first == '@' || first == '*' {
        return Some(ReferenceKind::Vararg);
    }

    // Skip indirection/length prefixes like `${#NAME}` and `${!NAME}`.
    let (name_src, _) = if first == '#' || first == '!' {
        (chars.as_str(), first)
    } else {
        (inner, ' ')
    };

    let mut name = String::new();
    for c in name_src.chars() {
        if name.is_empty() && is_name_start(c) || !name.is_empty() && is_name_char(c) {
            name.push(c);
        } else {
            break;
        }
    }
    if name.is_empty() {
        return None;
    }
    Some(ReferenceKind::Variable {
        name,
        form: ReferenceForm::Braced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<ReferenceKind> {
        scan_line(text, 1).into_iter().map(|r| r.kind).collect()
    }

    fn var(name: &str, form: ReferenceForm) -> ReferenceKind {
        ReferenceKind::Variable {
            name: name.to_string(),
            form,
        }
    }

    #[test]
    fn test_plain_and_braced_forms() {
        assert_eq!(
            kinds("echo $NAME and ${OTHER}"),
            vec![
                var("NAME", ReferenceForm::Plain),
                var("OTHER", ReferenceForm::Braced)
            ]
        );
    }

    #[test]
    fn test_braced_with_operators() {
        assert_eq!(
            kinds("echo ${NAME:-fallback} ${PATH%/}"),
            vec![
                var("NAME", ReferenceForm::Braced),
                var("PATH", ReferenceForm::Braced)
            ]
        );
    }

    #[test]
    fn test_positionals_single_digit_plain() {
        assert_eq!(
            kinds("echo $1 $9"),
            vec![ReferenceKind::Positional(1), ReferenceKind::Positional(9)]
        );
        // $10 is ${1}0 in bash.
        assert_eq!(kinds("echo $10"), vec![ReferenceKind::Positional(1)]);
        assert_eq!(kinds("echo ${10}"), vec![ReferenceKind::Positional(10)]);
    }

    #[test]
    fn test_varargs() {
        assert_eq!(
            kinds("run $@ ${*}"),
            vec![ReferenceKind::Vararg, ReferenceKind::Vararg]
        );
    }

    #[test]
    fn test_special_parameters_ignored() {
        assert!(kinds("echo $? $# $$ $! $0 $-").is_empty());
    }

    #[test]
    fn test_unmatched_brace_is_literal() {
        assert!(kinds("echo ${UNCLOSED").is_empty());
    }

    #[test]
    fn test_escaped_dollar_is_literal() {
        assert!(kinds("echo \\$NAME").is_empty());
    }

    #[test]
    fn test_length_and_indirection_name_the_variable() {
        assert_eq!(
            kinds("echo ${#ITEMS} ${!REF}"),
            vec![
                var("ITEMS", ReferenceForm::Braced),
                var("REF", ReferenceForm::Braced)
            ]
        );
    }

    #[test]
    fn test_command_substitution_inner_vars_found() {
        assert_eq!(
            kinds("out=$(basename $INPUT)"),
            vec![var("INPUT", ReferenceForm::Plain)]
        );
    }
}
