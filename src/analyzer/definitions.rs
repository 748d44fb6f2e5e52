//! Definition Site Scanner
//!
//! Finds every place a script binds a variable name. Bash has no static
//! scoping, so a single definition site anywhere in the script excludes
//! that name from the CLI surface regardless of line order.
//!
//! Recognized patterns:
//! - `NAME=value` and prefixed forms (`export`, `local`, `declare [-x]`,
//!   `readonly`)
//! - `for NAME in …`
//! - C-style `for ((NAME=0; …))`
//! - `while read NAME…` / `read -r NAME…` (every name listed is bound)
//! - `readarray NAME` / `mapfile NAME` array targets

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::script::Script;

lazy_static! {
    static ref ASSIGNMENT: Regex = Regex::new(
        r"^\s*(?:(export|local|readonly|declare)(?:\s+-[a-zA-Z]+)*\s+)?([A-Za-z_][A-Za-z0-9_]*)="
    )
    .unwrap();
    static ref FOR_IN: Regex =
        Regex::new(r"^\s*for\s+([A-Za-z_][A-Za-z0-9_]*)\s+in\b").unwrap();
    static ref FOR_C_STYLE: Regex =
        Regex::new(r"^\s*for\s*\(\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*=").unwrap();
    // Command position only: line start or after a separator/keyword,
    // with optional per-command assignments (`IFS=',' read …`). `read`
    // as an ordinary word inside a command's arguments binds nothing.
    static ref READ_VARS: Regex = Regex::new(
        r"(?:^|[;&|]|\bwhile\b|\buntil\b|\bdo\b|\bthen\b)\s*(?:[A-Za-z_][A-Za-z0-9_]*=\S*\s+)*read\s+((?:-[a-zA-Z]+\s+)*)([A-Za-z_][A-Za-z0-9_]*(?:[ \t]+[A-Za-z_][A-Za-z0-9_]*)*)"
    )
    .unwrap();
    static ref ARRAY_VARS: Regex = Regex::new(
        r"(?:^|[;&|]|\bwhile\b|\buntil\b|\bdo\b|\bthen\b)\s*(?:readarray|mapfile)\s+(?:-[a-zA-Z]+\s+)*([A-Za-z_][A-Za-z0-9_]*)"
    )
    .unwrap();
}

/// Why a name counts as defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionCause {
    Assignment,
    Export,
    FunctionLocal,
    ForLoop,
    CStyleFor,
    ReadLoop,
}

/// One binding occurrence of a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSite {
    pub name: String,
    pub line: usize,
    pub cause: DefinitionCause,
}

/// Definition sites on a single line.
pub fn scan_line(text: &str, line: usize) -> Vec<DefinitionSite> {
    let mut sites = Vec::new();

    if let Some(caps) = ASSIGNMENT.captures(text) {
        let cause = match caps.get(1).map(|m| m.as_str()) {
            Some("export") => DefinitionCause::Export,
            Some("local") | Some("declare") => DefinitionCause::FunctionLocal,
            Some("readonly") | None => DefinitionCause::Assignment,
            Some(_) => DefinitionCause::Assignment,
        };
        sites.push(DefinitionSite {
            name: caps[2].to_string(),
            line,
            cause,
        });
    }

    if let Some(caps) = FOR_C_STYLE.captures(text) {
        sites.push(DefinitionSite {
            name: caps[1].to_string(),
            line,
            cause: DefinitionCause::CStyleFor,
        });
    } else if let Some(caps) = FOR_IN.captures(text) {
        sites.push(DefinitionSite {
            name: caps[1].to_string(),
            line,
            cause: DefinitionCause::ForLoop,
        });
    }

    // Comment lines never bind via `read` (a macro comment may mention
    // it); assignment/for patterns above already require line starts
    // that a comment cannot match.
    if !text.trim_start().starts_with('#') {
        if let Some(caps) = READ_VARS.captures(text) {
            for name in caps[2].split_whitespace() {
                sites.push(DefinitionSite {
                    name: name.to_string(),
                    line,
                    cause: DefinitionCause::ReadLoop,
                });
            }
        }
        if let Some(caps) = ARRAY_VARS.captures(text) {
            sites.push(DefinitionSite {
                name: caps[1].to_string(),
                line,
                cause: DefinitionCause::ReadLoop,
            });
        }
    }

    sites
}

/// Every definition site in the script, in line order.
pub fn scan_script(script: &Script) -> Vec<DefinitionSite> {
    script
        .lines()
        .iter()
        .flat_map(|l| scan_line(&l.text, l.number))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        scan_line(text, 1).into_iter().map(|s| s.name).collect()
    }

    #[test]
    fn test_plain_assignment() {
        let sites = scan_line("COUNT=3", 4);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "COUNT");
        assert_eq!(sites[0].line, 4);
        assert_eq!(sites[0].cause, DefinitionCause::Assignment);
    }

    #[test]
    fn test_prefixed_assignments() {
        assert_eq!(
            scan_line("export PATH=/bin", 1)[0].cause,
            DefinitionCause::Export
        );
        assert_eq!(
            scan_line("local tmp=1", 1)[0].cause,
            DefinitionCause::FunctionLocal
        );
        assert_eq!(
            scan_line("declare -i n=0", 1)[0].cause,
            DefinitionCause::FunctionLocal
        );
        assert_eq!(
            scan_line("readonly MODE=fast", 1)[0].cause,
            DefinitionCause::Assignment
        );
    }

    #[test]
    fn test_for_loop_variable() {
        let sites = scan_line("for f in *.txt; do", 1);
        assert_eq!(sites[0].name, "f");
        assert_eq!(sites[0].cause, DefinitionCause::ForLoop);
    }

    #[test]
    fn test_c_style_for_counter() {
        let sites = scan_line("for ((i=0; i<10; i++)); do", 1);
        assert_eq!(sites[0].name, "i");
        assert_eq!(sites[0].cause, DefinitionCause::CStyleFor);
    }

    #[test]
    fn test_while_read_binds_all_names() {
        let sites = scan_line("while read -r key value; do", 1);
        let bound: Vec<_> = sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(bound, vec!["key", "value"]);
        assert!(sites.iter().all(|s| s.cause == DefinitionCause::ReadLoop));
    }

    #[test]
    fn test_readarray_binds_array_name() {
        let sites = scan_line("readarray -t parts < parts.txt", 1);
        assert_eq!(sites[0].name, "parts");
        assert_eq!(sites[0].cause, DefinitionCause::ReadLoop);
        assert_eq!(names("mapfile lines < input"), vec!["lines"]);
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        assert!(names("[ \"$A\" == \"b\" ]").is_empty());
        assert!(names("echo hi").is_empty());
    }

    #[test]
    fn test_comment_read_is_ignored() {
        assert!(names("# while read line").is_empty());
    }

    #[test]
    fn test_read_as_ordinary_word_does_not_bind() {
        assert!(names("echo \"read DATA from the cache\"").is_empty());
        assert!(names("grep read notes.txt").is_empty());
    }

    #[test]
    fn test_assignment_prefixed_read_binds() {
        let sites = scan_line("IFS=',' read -ra parts <<< \"$CSV\"", 1);
        let bound: Vec<_> = sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(bound, vec!["IFS", "parts"]);
    }

    #[test]
    fn test_scan_script_whole_text() {
        let script = Script::parse("A=1\nfor x in a b; do\n  echo $x\ndone\n");
        let sites = scan_script(&script);
        let bound: Vec<_> = sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(bound, vec!["A", "x"]);
    }
}
