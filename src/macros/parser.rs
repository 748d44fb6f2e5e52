//! Macro Comment Parser
//!
//! Recognizes the macro comment grammar:
//!
//! ```text
//! # for ITER in SOURCE [as TYPE] [sep S | separated by S] [| with PARAM...] [-> FUNC]
//! # endfor
//! # set strict
//! # trap cleanup [SIGNAL[,SIGNAL...]]
//! ```
//!
//! A comment that clearly attempts the iteration grammar but fails it is a
//! syntax error; any other comment is ordinary text and ignored. Clauses
//! are parsed off the tail of the line in reverse grammar order, so a
//! SOURCE expression may contain spaces, globs or substitutions.

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::errors::CompileError;
use crate::macros::types::{IterationSpec, MacroComment, MacroKind};
use crate::script::{leading_whitespace, Line};

/// Signals a `trap cleanup` macro registers on when no list is given.
pub const DEFAULT_TRAP_SIGNALS: &[&str] = &["EXIT", "ERR", "INT", "TERM"];

lazy_static! {
    static ref FOR_HEAD: Regex =
        Regex::new(r"^for\s+([A-Za-z_][A-Za-z0-9_]*)\s+in\s+(.+)$").unwrap();
    static ref FOR_PROBE: Regex = Regex::new(r"^for\s+\S+\s+in\s+\S").unwrap();
    static ref END_FOR: Regex = Regex::new(r"^endfor$").unwrap();
    static ref SET_STRICT: Regex = Regex::new(r"^set\s+strict$").unwrap();
    static ref TRAP_CLEANUP: Regex = Regex::new(r"^trap\s+cleanup(?:\s+(.+))?$").unwrap();
    static ref CALL_TAIL: Regex = Regex::new(r"^(.*?)\s*->\s*([A-Za-z_][A-Za-z0-9_]*)$").unwrap();
    static ref WITH_TAIL: Regex = Regex::new(r"^(.*?)\s*\|\s*with\s+(.+)$").unwrap();
    static ref SEP_TAIL: Regex =
        Regex::new(r"^(.*?)\s+(?:sep|separated\s+by)\s+(\S+)$").unwrap();
    static ref AS_TAIL: Regex = Regex::new(r"^(.*?)\s+as\s+([A-Za-z]+)$").unwrap();
}

/// Try to read a line as a macro comment. `Ok(None)` for ordinary text.
pub fn parse_macro_comment(line: &Line) -> Result<Option<MacroComment>, CompileError> {
    if !line.is_comment() || line.text.starts_with("#!") {
        return Ok(None);
    }
    let Some(body) = line.comment_body() else {
        return Ok(None);
    };

    let kind = if END_FOR.is_match(body) {
        MacroKind::EndFor
    } else if SET_STRICT.is_match(body) {
        MacroKind::Strict
    } else if let Some(caps) = TRAP_CLEANUP.captures(body) {
        let signals = match caps.get(1) {
            Some(m) => m
                .as_str()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_TRAP_SIGNALS.iter().map(|s| s.to_string()).collect(),
        };
        MacroKind::TrapCleanup { signals }
    } else if FOR_PROBE.is_match(body) {
        MacroKind::Iteration(parse_iteration(body, line.number, &line.text)?)
    } else {
        return Ok(None);
    };

    Ok(Some(MacroComment {
        line: line.number,
        indent: leading_whitespace(&line.text).to_string(),
        kind,
        raw: line.text.clone(),
    }))
}

/// Parse the body of a `for` macro comment into an [`IterationSpec`].
fn parse_iteration(body: &str, line: usize, raw: &str) -> Result<IterationSpec, CompileError> {
    let Some(caps) = FOR_HEAD.captures(body) else {
        return Err(CompileError::syntax(
            line,
            raw,
            "malformed iteration macro, expected `for ITER in SOURCE`",
        ));
    };
    let iterator = caps[1].to_string();
    let mut rest = caps[2].trim().to_string();

    let mut call_target = None;
    if let Some(caps) = CALL_TAIL.captures(&rest) {
        call_target = Some(caps[2].to_string());
        rest = caps[1].trim().to_string();
    }

    let mut extra_params = Vec::new();
    if let Some(caps) = WITH_TAIL.captures(&rest) {
        extra_params = caps[2].split_whitespace().map(str::to_string).collect();
        rest = caps[1].trim().to_string();
    }

    let mut separator = None;
    if let Some(caps) = SEP_TAIL.captures(&rest) {
        let sep = unescape_separator(unquote(&caps[2]));
        if sep.is_empty() {
            return Err(CompileError::syntax(line, raw, "separator is empty"));
        }
        separator = Some(sep);
        rest = caps[1].trim().to_string();
    }

    let mut type_override = None;
    if let Some(caps) = AS_TAIL.captures(&rest) {
        type_override = Some(caps[2].to_string());
        rest = caps[1].trim().to_string();
    }

    if rest.is_empty() {
        return Err(CompileError::syntax(
            line,
            raw,
            "iteration macro has an empty source expression",
        ));
    }

    Ok(IterationSpec {
        iterator,
        source: rest,
        type_override,
        separator,
        extra_params,
        call_target,
    })
}

/// Strip one level of matching quotes around a separator token.
fn unquote(token: &str) -> &str {
    let bytes = token.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

/// Decode escape sequences in a separator token (`\n`, `\t`, `\r`, `\\`).
pub fn unescape_separator(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
