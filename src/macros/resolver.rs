//! Macro Target Resolver & Expander
//!
//! Resolves the code region each macro governs and drives expansion.
//! Targets are tried in order:
//! 1. the lines between the macro and its depth-matched `# endfor`
//! 2. the complete body of a function opened by the next non-blank line
//!    (iteration macros only; generation switches to call-target form)
//! 3. a contiguous run of lines indented past the macro itself
//! 4. the single next non-blank line
//!
//! Nested macros inside a terminator block are expanded first, innermost
//! out, so an outer loop always wraps fully generated inner text. The
//! walk fails fast on conflicts: a macro whose target would swallow
//! another macro comment, and a function carrying both a preceding macro
//! and internal ones, abort the whole compilation with both locations
//! named.

use std::collections::BTreeSet;

use crate::analyzer::functions;
use crate::errors::CompileError;
use crate::macros::codegen::{self, Strategy};
use crate::macros::parser::parse_macro_comment;
use crate::macros::types::{IterationSpec, MacroComment, MacroKind};
use crate::script::{Line, Script};
use crate::types::TypeRegistry;

use lazy_static::lazy_static;
use regex_lite::Regex;

lazy_static! {
    static ref BARE_CALL: Regex = Regex::new(r"^(\s*)([A-Za-z_][A-Za-z0-9_]*)\s*$").unwrap();
}

/// Result of macro expansion over a whole script.
#[derive(Debug, Clone)]
pub struct MacroExpansion {
    pub script: Script,
    /// Iterator names bound by expanded loops; excluded from the CLI
    /// surface by the re-classification pass.
    pub iterators: BTreeSet<String>,
    /// Whether any `# set strict` macro was present.
    pub strict: bool,
}

/// Expand every macro in `script`. `file_typed` names the variables whose
/// annotation type carries the file-line iteration hint.
pub fn expand(
    script: &Script,
    file_typed: &BTreeSet<String>,
) -> Result<MacroExpansion, CompileError> {
    let mut walker = Walker {
        script,
        file_typed,
        registry: TypeRegistry::new(),
        iterators: BTreeSet::new(),
        strict: false,
    };
    let mut lines = walker.expand_slice(script.lines())?;
    if walker.strict {
        codegen::insert_strict_mode(&mut lines);
    }
    Ok(MacroExpansion {
        script: Script::from_lines(lines, script.has_trailing_newline()),
        iterators: walker.iterators,
        strict: walker.strict,
    })
}

struct Walker<'a> {
    script: &'a Script,
    file_typed: &'a BTreeSet<String>,
    registry: TypeRegistry,
    iterators: BTreeSet<String>,
    strict: bool,
}

impl Walker<'_> {
    fn expand_slice(&mut self, lines: &[Line]) -> Result<Vec<String>, CompileError> {
        let mut out = Vec::with_capacity(lines.len());
        let mut i = 0;
        while i < lines.len() {
            let line = &lines[i];
            let Some(mac) = parse_macro_comment(line)? else {
                out.push(line.text.clone());
                i += 1;
                continue;
            };
            match mac.kind.clone() {
                MacroKind::Strict => {
                    self.strict = true;
                    i += 1;
                }
                MacroKind::EndFor => {
                    // A terminator with no opener is left as-is.
                    out.push(line.text.clone());
                    i += 1;
                }
                MacroKind::Iteration(spec) => {
                    i = self.expand_iteration(lines, i, &mac, spec, &mut out)?;
                }
                MacroKind::TrapCleanup { signals } => {
                    i = self.expand_trap(lines, i, &mac, &signals, &mut out)?;
                }
            }
        }
        Ok(out)
    }

    fn expand_iteration(
        &mut self,
        lines: &[Line],
        at: usize,
        mac: &MacroComment,
        spec: IterationSpec,
        out: &mut Vec<String>,
    ) -> Result<usize, CompileError> {
        self.iterators.insert(spec.iterator.clone());
        let strategy =
            codegen::select_strategy(&spec, mac.line, self.file_typed, &self.registry)?;

        // `-> FUNC` needs no target at all: the loop body is the call.
        if let Some(func) = &spec.call_target {
            let body = vec![codegen::call_line(&spec, func, &format!("{}    ", mac.indent))];
            out.extend(codegen::generate_loop(&spec, strategy, &mac.indent, &body));
            return Ok(at + 1);
        }

        // Rule 1: depth-matched terminator.
        if let Some(end) = find_matching_endfor(lines, at)? {
            let body = self.expand_slice(&lines[at + 1..end])?;
            out.extend(codegen::generate_loop(&spec, strategy, &mac.indent, &body));
            return Ok(end + 1);
        }

        let Some(next) = next_non_blank(lines, at + 1) else {
            return Err(CompileError::unresolved_target(mac.line, &mac.raw));
        };

        if let Some(other) = parse_macro_comment(&lines[next])? {
            return Err(stacked_conflict(mac, &other));
        }

        // Rule 2: the next line opens a function; generation becomes
        // call-target form and the definition is emitted untouched.
        if let Some(func_name) = functions::parse_function_header(&lines[next].text) {
            if let Some(func_end) = functions::find_function_end_in(lines, next) {
                for inner in &lines[next + 1..func_end] {
                    if let Some(inner_mac) = parse_macro_comment(inner)? {
                        return Err(function_conflict(mac, &inner_mac));
                    }
                }
                for def_line in &lines[next..=func_end] {
                    out.push(def_line.text.clone());
                }
                out.push(String::new());
                let body =
                    vec![codegen::call_line(&spec, &func_name, &format!("{}    ", mac.indent))];
                out.extend(codegen::generate_loop(&spec, strategy, &mac.indent, &body));
                return Ok(func_end + 1);
            }
        }

        // Rule 3: an indented run following the macro.
        if let Some(end) = indented_run(lines, next, mac) {
            for inner in &lines[next..=end] {
                if let Some(inner_mac) = parse_macro_comment(inner)? {
                    return Err(stacked_conflict(mac, &inner_mac));
                }
            }
            let body: Vec<String> = lines[next..=end].iter().map(|l| l.text.clone()).collect();
            out.extend(codegen::generate_loop(&spec, strategy, &mac.indent, &body));
            return Ok(end + 1);
        }

        // Rule 4: the single next non-blank line.
        let body = vec![self.single_line_body(&lines[next], &spec)];
        out.extend(codegen::generate_loop(&spec, strategy, &mac.indent, &body));
        Ok(next + 1)
    }

    /// A single-line body that is just the name of a function defined
    /// anywhere in the script becomes a call passing the iterator as $1.
    fn single_line_body(&self, line: &Line, spec: &IterationSpec) -> String {
        if let Some(caps) = BARE_CALL.captures(&line.text) {
            let func = caps[2].to_string();
            if functions::is_defined_function(self.script, &func) {
                return codegen::call_line(spec, &func, &caps[1]);
            }
        }
        line.text.clone()
    }

    fn expand_trap(
        &mut self,
        lines: &[Line],
        at: usize,
        mac: &MacroComment,
        signals: &[String],
        out: &mut Vec<String>,
    ) -> Result<usize, CompileError> {
        let Some(next) = next_non_blank(lines, at + 1) else {
            return Err(CompileError::unresolved_target(mac.line, &mac.raw));
        };
        if let Some(other) = parse_macro_comment(&lines[next])? {
            return Err(stacked_conflict(mac, &other));
        }

        // Block or single-line resolution only; a trap macro never takes
        // a function-body target.
        let end = match indented_run(lines, next, mac) {
            Some(end) => {
                for inner in &lines[next..=end] {
                    if let Some(inner_mac) = parse_macro_comment(inner)? {
                        return Err(stacked_conflict(mac, &inner_mac));
                    }
                }
                end
            }
            None => next,
        };

        let body: Vec<String> = lines[next..=end].iter().map(|l| l.text.clone()).collect();
        out.extend(codegen::generate_trap(mac.line, &mac.indent, signals, &body));
        Ok(end + 1)
    }
}

/// Index of the `# endfor` matching the iteration macro at `at`, tracking
/// nesting with a depth counter.
fn find_matching_endfor(lines: &[Line], at: usize) -> Result<Option<usize>, CompileError> {
    let mut depth = 1usize;
    for (offset, line) in lines[at + 1..].iter().enumerate() {
        match parse_macro_comment(line)? {
            Some(MacroComment {
                kind: MacroKind::Iteration(_),
                ..
            }) => depth += 1,
            Some(MacroComment {
                kind: MacroKind::EndFor,
                ..
            }) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Some(at + 1 + offset));
                }
            }
            _ => {}
        }
    }
    Ok(None)
}

fn next_non_blank(lines: &[Line], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&i| !lines[i].is_blank())
}

/// The end index of a contiguous run starting at `first` whose lines are
/// indented past the macro and at least as far as the run's first line.
/// Returns `None` when the first line is not indented past the macro.
fn indented_run(lines: &[Line], first: usize, mac: &MacroComment) -> Option<usize> {
    let macro_indent = crate::script::indent_width(&mac.raw);
    let run_indent = lines[first].indent;
    if run_indent <= macro_indent {
        return None;
    }
    let mut end = first;
    for (offset, line) in lines[first + 1..].iter().enumerate() {
        if line.is_blank() {
            continue;
        }
        if line.indent < run_indent {
            break;
        }
        end = first + 1 + offset;
    }
    Some(end)
}

fn stacked_conflict(first: &MacroComment, second: &MacroComment) -> CompileError {
    CompileError::conflict(
        first.line,
        second.line,
        "two macros resolve to overlapping targets",
        "Give each macro its own target on a separate line, use the function-call form \
         (-> FUNC), or combine both into a single macro",
    )
}

fn function_conflict(outer: &MacroComment, inner: &MacroComment) -> CompileError {
    CompileError::conflict(
        outer.line,
        inner.line,
        "a function-level macro conflicts with macros inside the function body",
        "Remove the function-level macro, remove the internal macros, or restructure the \
         function so the loops run sequentially",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_text(text: &str) -> MacroExpansion {
        expand(&Script::parse(text), &BTreeSet::new()).unwrap()
    }

    fn expand_err(text: &str) -> CompileError {
        expand(&Script::parse(text), &BTreeSet::new()).unwrap_err()
    }

    #[test]
    fn test_macro_free_script_unchanged() {
        let text = "#!/bin/bash\necho hello\n# a plain comment\n";
        assert_eq!(expand_text(text).script.text(), text);
    }

    #[test]
    fn test_endfor_block_target() {
        let out = expand_text("# for x in $LIST\necho \"$x\"\ndate\n# endfor\n");
        assert_eq!(
            out.script.text(),
            "for x in $LIST; do\necho \"$x\"\ndate\ndone\n"
        );
        assert!(out.iterators.contains("x"));
    }

    #[test]
    fn test_single_line_target() {
        let out = expand_text("# for item in a b c\necho $item\necho after\n");
        assert_eq!(
            out.script.text(),
            "for item in a b c; do\necho $item\ndone\necho after\n"
        );
    }

    #[test]
    fn test_bare_name_source_expands() {
        let out = expand_text("# for x in LIST\necho $x\n");
        assert!(out.script.text().starts_with("for x in ${LIST}; do"));
    }

    #[test]
    fn test_nested_endfor_blocks_innermost_first() {
        let text = "# for a in $OUTER\n# for b in $INNER\necho $a $b\n# endfor\n# endfor\n";
        let out = expand_text(text);
        assert_eq!(
            out.script.text(),
            "for a in $OUTER; do\nfor b in $INNER; do\necho $a $b\ndone\ndone\n"
        );
        assert!(out.iterators.contains("a") && out.iterators.contains("b"));
    }

    #[test]
    fn test_indented_block_target() {
        let text = "# for f in *.txt\n    wc -l \"$f\"\n    echo done with $f\necho outside\n";
        let out = expand_text(text);
        assert_eq!(
            out.script.text(),
            "for f in *.txt; do\n    wc -l \"$f\"\n    echo done with $f\ndone\necho outside\n"
        );
    }

    #[test]
    fn test_function_target_becomes_call_form() {
        let text = "# for f in *.log\nprocess() {\n    echo \"$1\"\n}\n";
        let out = expand_text(text);
        let expected = "process() {\n    echo \"$1\"\n}\n\nfor f in *.log; do\n    process \"$f\"\ndone\n";
        assert_eq!(out.script.text(), expected);
    }

    #[test]
    fn test_call_target_arrow_form() {
        let out = expand_text("# for f in *.log -> process\nprocess() {\n  echo \"$1\"\n}\n");
        let text = out.script.text();
        assert!(text.contains("for f in *.log; do"));
        assert!(text.contains("    process \"$f\""));
        // The function definition stays where it was.
        assert!(text.contains("process() {"));
    }

    #[test]
    fn test_with_params_passed_after_iterator() {
        let out = expand_text("# for f in *.log | with $MODE -> handle\n");
        assert!(out.script.text().contains("handle \"$f\" \"$MODE\""));
    }

    #[test]
    fn test_bare_function_name_body_becomes_call() {
        let text = "process() {\n  echo \"$1\"\n}\n# for f in $FILES\nprocess\n";
        let out = expand_text(text);
        assert!(out.script.text().contains("process \"$f\"\ndone"));
    }

    #[test]
    fn test_stacked_macros_conflict() {
        let err = expand_err("# for a in $X\n# for b in $Y\necho $a $b\n");
        let CompileError::Conflict {
            first_line,
            second_line,
            ..
        } = err
        else {
            panic!("expected conflict, got {:?}", err);
        };
        assert_eq!((first_line, second_line), (1, 2));
    }

    #[test]
    fn test_function_with_internal_macro_conflicts() {
        let text = "# for f in *.log\nprocess() {\n    # for l in $LINES\n    echo $l\n}\n";
        let err = expand_err(text);
        assert!(matches!(err, CompileError::Conflict { first_line: 1, second_line: 3, .. }));
    }

    #[test]
    fn test_macro_at_end_of_file_unresolved() {
        let err = expand_err("echo hi\n# for x in $LIST\n");
        assert!(matches!(err, CompileError::UnresolvedTarget { line: 2, .. }));
    }

    #[test]
    fn test_strict_macro_collapses_after_shebang() {
        let text = "#!/bin/bash\n# set strict\necho one\n# set strict\necho two\n";
        let out = expand_text(text);
        assert!(out.strict);
        assert_eq!(
            out.script.text(),
            "#!/bin/bash\nset -eou --pipefail\necho one\necho two\n"
        );
    }

    #[test]
    fn test_strict_without_shebang_goes_on_top() {
        let out = expand_text("# set strict\necho hi\n");
        assert_eq!(out.script.text(), "set -eou --pipefail\necho hi\n");
    }

    #[test]
    fn test_trap_cleanup_moves_target_into_handler() {
        let text = "#!/bin/bash\n# trap cleanup\nrm -f \"$TMP\"\necho next\n";
        let out = expand_text(text);
        let expanded = out.script.text();
        assert!(expanded.contains("__cleanup_2() {"));
        assert!(expanded.contains("local exit_code=$?"));
        assert!(expanded.contains("rm -f \"$TMP\""));
        assert!(expanded.contains("exit $exit_code"));
        assert!(expanded.contains("trap __cleanup_2 EXIT ERR INT TERM"));
        // The cleanup command lives only inside the handler now.
        let after_handler = expanded.split("trap __cleanup_2").nth(1).unwrap();
        assert!(!after_handler.contains("rm -f"));
    }

    #[test]
    fn test_trap_cleanup_custom_signals() {
        let out = expand_text("# trap cleanup INT,TERM\nrm -f lock\n");
        assert!(out.script.text().contains("trap __cleanup_1 INT TERM"));
    }

    #[test]
    fn test_two_trap_macros_get_distinct_handlers() {
        let text = "# trap cleanup\nrm -f a\necho mid\n# trap cleanup\nrm -f b\n";
        let out = expand_text(text);
        let expanded = out.script.text();
        assert!(expanded.contains("__cleanup_1"));
        assert!(expanded.contains("__cleanup_4"));
    }

    #[test]
    fn test_trap_with_indented_block() {
        let text = "# trap cleanup\n    rm -f \"$A\"\n    rm -f \"$B\"\necho on\n";
        let out = expand_text(text);
        let expanded = out.script.text();
        assert!(expanded.contains("rm -f \"$A\"\n    rm -f \"$B\""));
        assert!(expanded.contains("echo on"));
    }

    #[test]
    fn test_stray_endfor_left_alone() {
        let out = expand_text("echo hi\n# endfor\n");
        assert_eq!(out.script.text(), "echo hi\n# endfor\n");
    }

    #[test]
    fn test_file_typed_source_uses_read_loop() {
        let file_typed: BTreeSet<String> = ["LOGFILE".to_string()].into();
        let out = expand(
            &Script::parse("# for line in $LOGFILE\necho $line\n"),
            &file_typed,
        )
        .unwrap();
        assert_eq!(
            out.script.text(),
            "while IFS= read -r line; do\necho $line\ndone < \"$LOGFILE\"\n"
        );
    }

    #[test]
    fn test_sep_macro_generates_split_loop() {
        let out = expand_text("# for item in $CSV sep ,\necho $item\n");
        assert_eq!(
            out.script.text(),
            "IFS=',' read -ra __item_items <<< \"$CSV\"\nfor item in \"${__item_items[@]}\"; do\necho $item\ndone\n"
        );
    }
}
