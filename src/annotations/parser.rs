//! Annotation Comment Parser
//!
//! Parses documentation comments of the shape
//!
//! ```text
//! # NAME (type[params]) [alias: -x] [group: G]: Description. Default: value
//! ```
//!
//! plus the natural-language group declarations
//!
//! ```text
//! # group A, B as Name
//! # one of A, B as Name
//! ```
//!
//! and the script-level `# Description: …` metadata line. Variable names
//! are normalized to uppercase; an omitted type clause means `str`. The
//! parser is pure over its input lines: it returns structured annotations
//! or a `CompileError` naming the offending token, and never mutates
//! anything.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::errors::CompileError;
use crate::script::Script;

lazy_static! {
    /// `# NAME (type…) [opt: v]…: description`
    static ref ANNOTATION: Regex = Regex::new(
        r"^#\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\(([^)]*)\))?\s*((?:\[[^\]]*\]\s*)*):\s*(.*)$"
    )
    .unwrap();
    /// One bracketed option, `[key: value]` or bare `[key]`.
    static ref OPTION: Regex =
        Regex::new(r"\[\s*([A-Za-z_]+)\s*(?::\s*([^\]]*))?\]").unwrap();
    /// Type clause content, `name` or `name[a, b, c]`.
    static ref TYPE_CLAUSE: Regex =
        Regex::new(r"^\s*([A-Za-z]+)\s*(?:\[([^\]]*)\])?\s*$").unwrap();
    /// `. Default: value` tail of a description.
    static ref DEFAULT_TAIL: Regex = Regex::new(r"\.\s*[Dd]efault\s*:\s*").unwrap();
    /// `# Description: …` script metadata.
    static ref SCRIPT_DESCRIPTION: Regex =
        Regex::new(r"^#\s*[Dd]escription\s*:\s*(.+)$").unwrap();
    /// `# group A, B as Name` / `# one of A, B as Name`
    static ref GROUP_DECL: Regex =
        Regex::new(r"^#\s*(group|one\s+of)\s+([A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)+)(?:\s+as\s+([A-Za-z_][A-Za-z0-9_]*))?\s*$")
            .unwrap();
}

/// A group reference on an annotation or declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupName {
    Named(String),
    /// No name given; one is auto-generated sequentially at build time.
    Auto,
}

/// One parsed argument annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub line: usize,
    /// Type name exactly as written; `None` means the implicit `str`.
    pub type_name: Option<String>,
    /// Bracketed value list for choice types.
    pub choices: Option<Vec<String>>,
    /// Normalized to a single leading dash.
    pub alias: Option<String>,
    pub group: Option<GroupName>,
    pub exclusive_group: Option<GroupName>,
    pub description: String,
    pub default: Option<String>,
}

/// A natural-language group declaration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDecl {
    pub line: usize,
    pub exclusive: bool,
    pub members: Vec<String>,
    pub name: GroupName,
}

/// Everything the annotation pass extracts from comments.
#[derive(Debug, Clone, Default)]
pub struct ParsedComments {
    pub annotations: IndexMap<String, Annotation>,
    pub group_decls: Vec<GroupDecl>,
    pub script_description: Option<String>,
}

/// Parse all annotation-bearing comments in the script.
pub fn parse_annotations(script: &Script) -> Result<ParsedComments, CompileError> {
    let mut out = ParsedComments::default();

    for line in script.lines() {
        let trimmed = line.text.trim();
        if !trimmed.starts_with('#') || trimmed.starts_with("#!") {
            continue;
        }

        if let Some(caps) = SCRIPT_DESCRIPTION.captures(trimmed) {
            if out.script_description.is_none() {
                out.script_description = Some(caps[1].trim().to_string());
            }
            continue;
        }

        if let Some(caps) = GROUP_DECL.captures(trimmed) {
            let exclusive = caps[1].starts_with("one");
            let members = caps[2]
                .split(',')
                .map(|m| m.trim().to_uppercase())
                .collect();
            let name = match caps.get(3) {
                Some(m) => GroupName::Named(m.as_str().to_string()),
                None => GroupName::Auto,
            };
            out.group_decls.push(GroupDecl {
                line: line.number,
                exclusive,
                members,
                name,
            });
            continue;
        }

        let Some(annotation) = parse_annotation_line(trimmed, line.number)? else {
            continue;
        };
        if out.annotations.contains_key(&annotation.name) {
            return Err(CompileError::syntax(
                line.number,
                trimmed,
                format!("duplicate annotation for variable {}", annotation.name),
            ));
        }
        out.annotations.insert(annotation.name.clone(), annotation);
    }

    Ok(out)
}

/// Parse one comment line as an annotation. `Ok(None)` means the line is
/// an ordinary comment, not an annotation.
pub fn parse_annotation_line(
    trimmed: &str,
    line: usize,
) -> Result<Option<Annotation>, CompileError> {
    let Some(caps) = ANNOTATION.captures(trimmed) else {
        return Ok(None);
    };

    let name = caps[1].to_uppercase();
    let type_clause = caps.get(2).map(|m| m.as_str().to_string());
    let options_src = caps.get(3).map(|m| m.as_str()).unwrap_or("");
    let rest = caps.get(4).map(|m| m.as_str()).unwrap_or("");

    // Macro and metadata keywords are never argument names.
    if matches!(name.as_str(), "FOR" | "ENDFOR" | "SET" | "TRAP") {
        return Ok(None);
    }

    let (type_name, choices) = match &type_clause {
        Some(src) => {
            let Some(tcaps) = TYPE_CLAUSE.captures(src) else {
                return Err(CompileError::syntax(
                    line,
                    trimmed,
                    format!("malformed type clause ({})", src),
                ));
            };
            let type_name = tcaps[1].to_string();
            let choices = tcaps.get(2).map(|m| {
                m.as_str()
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
            });
            (Some(type_name), choices)
        }
        None => (None, None),
    };

    let mut alias = None;
    let mut group = None;
    let mut exclusive_group = None;

    for opt in OPTION.captures_iter(options_src) {
        let key = opt[1].to_ascii_lowercase();
        let value = opt.get(2).map(|m| m.as_str().trim().to_string());
        match key.as_str() {
            "alias" => {
                let raw = value.unwrap_or_default();
                alias = Some(normalize_alias(&raw, line, trimmed)?);
            }
            "group" => {
                group = Some(group_name_from(value));
            }
            "exclusive_group" | "exclusive" => {
                exclusive_group = Some(group_name_from(value));
            }
            other => {
                return Err(CompileError::syntax(
                    line,
                    trimmed,
                    format!("unknown annotation option [{}]", other),
                ));
            }
        }
    }

    let (description, default) = split_default(rest);

    Ok(Some(Annotation {
        name,
        line,
        type_name,
        choices,
        alias,
        group,
        exclusive_group,
        description,
        default,
    }))
}

fn group_name_from(value: Option<String>) -> GroupName {
    match value {
        Some(v) if !v.is_empty() => GroupName::Named(v),
        _ => GroupName::Auto,
    }
}

/// Normalize an alias to exactly one leading dash. An alias with no
/// usable character after the dash is an error.
fn normalize_alias(raw: &str, line: usize, text: &str) -> Result<String, CompileError> {
    let stripped = raw.trim_start_matches('-');
    if stripped.is_empty() {
        return Err(CompileError::syntax(
            line,
            text,
            format!("alias {:?} has no character after the dash", raw),
        ));
    }
    Ok(format!("-{}", stripped))
}

/// Split `Description. Default: value` into its two parts.
fn split_default(rest: &str) -> (String, Option<String>) {
    match DEFAULT_TAIL.find(rest) {
        Some(m) => {
            let description = rest[..m.start()].trim().to_string();
            let default = rest[m.end()..].trim().to_string();
            (description, Some(default))
        }
        None => (rest.trim().trim_end_matches('.').to_string(), None),
    }
}
