//! Macro Code Generator
//!
//! Turns resolved macros into plain shell text. Generation never alters
//! variable names or user body text beyond the required templating; body
//! lines are emitted verbatim between the generated loop header and
//! footer.
//!
//! Iteration strategies:
//! - file-line:       `while IFS= read -r X; do … done < "$SRC"`
//! - single-char sep: `IFS=',' read -ra TMP <<< "$SRC"` + array loop
//! - multi-char sep:  stream edit (`sed`) turns separators into newlines,
//!   `readarray` collects the pieces (single-character `IFS` splitting
//!   cannot express multi-character delimiters)
//! - plain:           `for X in SRC; do … done`
//!
//! Both array strategies produce an empty array for an empty source
//! string, so delimited iteration over an empty source runs zero times.

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::errors::CompileError;
use crate::macros::types::IterationSpec;
use crate::types::TypeRegistry;
use std::collections::BTreeSet;

/// The strict-mode line `# set strict` collapses to.
pub const STRICT_MODE_LINE: &str = "set -eou --pipefail";

lazy_static! {
    static ref BARE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref VAR_SOURCE: Regex =
        Regex::new(r"^\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?$").unwrap();
}

/// How the source expression is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FileLines,
    SingleCharSep,
    MultiCharSep,
    Plain,
}

/// Pick the iteration strategy: an explicit separator always forces
/// delimited iteration, an explicit `as TYPE` wins next, then a
/// file-typed source variable implies file-line iteration.
pub fn select_strategy(
    spec: &IterationSpec,
    line: usize,
    file_typed: &BTreeSet<String>,
    registry: &TypeRegistry,
) -> Result<Strategy, CompileError> {
    if let Some(sep) = &spec.separator {
        return Ok(if sep.chars().count() == 1 {
            Strategy::SingleCharSep
        } else {
            Strategy::MultiCharSep
        });
    }
    if let Some(type_name) = &spec.type_override {
        let handler = registry.lookup(type_name).ok_or_else(|| {
            CompileError::type_validation(line, type_name.clone(), "unknown type name in `as` clause")
        })?;
        return Ok(if handler.iterates_file_lines {
            Strategy::FileLines
        } else {
            Strategy::Plain
        });
    }
    if let Some(name) = source_variable(&spec.source) {
        if file_typed.contains(name) {
            return Ok(Strategy::FileLines);
        }
    }
    Ok(Strategy::Plain)
}

/// The variable name a source expression references, when it is exactly
/// one variable (`$V`, `${V}`) or a bare name.
fn source_variable(source: &str) -> Option<&str> {
    if let Some(caps) = VAR_SOURCE.captures(source) {
        return Some(caps.get(1).unwrap().as_str());
    }
    if BARE_NAME.is_match(source) {
        return Some(source);
    }
    None
}

/// Source as a loop list: a bare shell name becomes `${NAME}`, any other
/// expression (glob, range, substitution) is used verbatim.
fn plain_source(source: &str) -> String {
    if BARE_NAME.is_match(source) {
        format!("${{{}}}", source)
    } else {
        source.to_string()
    }
}

/// Source as a single word for `<<<` and `<` positions: double-quoted
/// unless the author already quoted it.
fn quoted_source(source: &str) -> String {
    if source.starts_with('"') && source.ends_with('"') && source.len() >= 2 {
        return source.to_string();
    }
    if BARE_NAME.is_match(source) {
        return format!("\"${{{}}}\"", source);
    }
    format!("\"{}\"", source)
}

/// Render a single-character separator for an `IFS=` assignment.
fn ifs_literal(sep: &str) -> String {
    match sep {
        "\n" => "$'\\n'".to_string(),
        "\t" => "$'\\t'".to_string(),
        "\r" => "$'\\r'".to_string(),
        "'" => "\"'\"".to_string(),
        other => format!("'{}'", other),
    }
}

/// Escape a decoded separator into a `sed` pattern.
fn sed_pattern(sep: &str) -> String {
    let mut out = String::new();
    for c in sep.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '/' | '\\' | '.' | '*' | '[' | ']' | '^' | '$' | '&' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

/// Temp array name for delimited iteration, derived from the iterator.
fn split_array_name(iterator: &str) -> String {
    format!("__{}_items", iterator)
}

/// Generate the loop wrapping `body` for one iteration macro.
pub fn generate_loop(
    spec: &IterationSpec,
    strategy: Strategy,
    indent: &str,
    body: &[String],
) -> Vec<String> {
    let iter = &spec.iterator;
    let mut out = Vec::with_capacity(body.len() + 3);

    match strategy {
        Strategy::FileLines => {
            out.push(format!("{}while IFS= read -r {}; do", indent, iter));
            out.extend(body.iter().cloned());
            out.push(format!("{}done < {}", indent, quoted_source(&spec.source)));
        }
        Strategy::SingleCharSep => {
            let array = split_array_name(iter);
            let sep = spec.separator.as_deref().unwrap_or_default();
            out.push(format!(
                "{}IFS={} read -ra {} <<< {}",
                indent,
                ifs_literal(sep),
                array,
                quoted_source(&spec.source)
            ));
            out.push(format!("{}for {} in \"${{{}[@]}}\"; do", indent, iter, array));
            out.extend(body.iter().cloned());
            out.push(format!("{}done", indent));
        }
        Strategy::MultiCharSep => {
            let array = split_array_name(iter);
            let sep = spec.separator.as_deref().unwrap_or_default();
            out.push(format!(
                "{}readarray -t {} < <(printf '%s' {} | sed -e 's/{}/\\n/g')",
                indent,
                array,
                quoted_source(&spec.source),
                sed_pattern(sep)
            ));
            out.push(format!("{}for {} in \"${{{}[@]}}\"; do", indent, iter, array));
            out.extend(body.iter().cloned());
            out.push(format!("{}done", indent));
        }
        Strategy::Plain => {
            out.push(format!(
                "{}for {} in {}; do",
                indent,
                iter,
                plain_source(&spec.source)
            ));
            out.extend(body.iter().cloned());
            out.push(format!("{}done", indent));
        }
    }

    out
}

/// The call line for call-target form: the function receives the iterator
/// as `$1` and each `with` parameter after it, in order.
pub fn call_line(spec: &IterationSpec, func: &str, indent: &str) -> String {
    let mut call = format!("{}{} \"${}\"", indent, func, spec.iterator);
    for param in &spec.extra_params {
        call.push_str(&format!(" \"{}\"", param));
    }
    call
}

/// Generate the handler function and registration for one `trap cleanup`
/// macro. The handler name carries the macro's 1-based line number so
/// multiple trap macros never collide.
pub fn generate_trap(
    macro_line: usize,
    indent: &str,
    signals: &[String],
    body: &[String],
) -> Vec<String> {
    let handler = format!("__cleanup_{}", macro_line);
    let mut out = Vec::with_capacity(body.len() + 5);
    out.push(format!("{}{}() {{", indent, handler));
    out.push(format!("{}    local exit_code=$?", indent));
    out.extend(body.iter().cloned());
    out.push(format!("{}    exit $exit_code", indent));
    out.push(format!("{}}}", indent));
    out.push(format!("{}trap {} {}", indent, handler, signals.join(" ")));
    out
}

/// Insert the strict-mode line immediately after the shebang, or at the
/// top when there is none. Called once however many `# set strict`
/// macros the script carried.
pub fn insert_strict_mode(lines: &mut Vec<String>) {
    let at = usize::from(lines.first().is_some_and(|l| l.starts_with("#!")));
    lines.insert(at, STRICT_MODE_LINE.to_string());
}
