//! Variable Classifier
//!
//! Single forward pass over the script that produces the CLI-relevant
//! variable surface:
//! - `Required` — referenced, never defined, absent from the environment
//! - `EnvOptional` — referenced, never defined, present in the environment
//!   (carries the environment value as its default)
//! - positional parameters and the vararg collectors
//!
//! Bash has no static scoping, so definedness is a whole-script property:
//! one definition site anywhere (even after first apparent use) excludes a
//! name. Positional and vararg references inside a function body refer to
//! that function's own arguments and are never promoted to script-level
//! parameters.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::analyzer::definitions::{self, DefinitionSite};
use crate::analyzer::functions::{self, FunctionSpan};
use crate::analyzer::references::{self, Reference, ReferenceForm, ReferenceKind};
use crate::analyzer::EnvSnapshot;
use crate::script::Script;

/// A variable reference with its enclosing-function flag resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    pub name: String,
    pub line: usize,
    pub form: ReferenceForm,
    pub in_function: bool,
}

/// Classification of a single CLI-relevant name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableClass {
    Required,
    /// Present in the environment; the payload is the ambient value used
    /// as the default.
    EnvOptional(String),
}

/// The classifier's full output for one pass.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub references: Vec<VariableReference>,
    pub definitions: Vec<DefinitionSite>,
    pub defined_names: BTreeSet<String>,
    /// Referenced-but-undefined names, in sorted order, with their class.
    pub variables: IndexMap<String, VariableClass>,
    /// Script-level positional indices in ascending order.
    pub positionals: BTreeSet<u32>,
    pub varargs: bool,
}

impl Classification {
    pub fn required_names(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|(_, c)| matches!(c, VariableClass::Required))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn env_optional_names(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|(_, c)| matches!(c, VariableClass::EnvOptional(_)))
            .map(|(n, _)| n.as_str())
            .collect()
    }
}

/// Classify every variable reference in the script. `excluded` holds
/// names bound outside the script text proper (macro iterator variables);
/// they are treated as defined.
pub fn classify(script: &Script, env: &EnvSnapshot, excluded: &BTreeSet<String>) -> Classification {
    let spans = functions::find_functions(script);
    let definitions = definitions::scan_script(script);

    let mut defined_names: BTreeSet<String> =
        definitions.iter().map(|d| d.name.clone()).collect();
    defined_names.extend(excluded.iter().cloned());

    let mut references = Vec::new();
    let mut used_names: BTreeSet<String> = BTreeSet::new();
    let mut positionals = BTreeSet::new();
    let mut varargs = false;

    for line in script.lines() {
        let in_function = in_function_body(&spans, line.number);
        for Reference { kind, line } in references::scan_line(&line.text, line.number) {
            match kind {
                ReferenceKind::Variable { name, form } => {
                    used_names.insert(name.clone());
                    references.push(VariableReference {
                        name,
                        line,
                        form,
                        in_function,
                    });
                }
                // Function-scoped positionals/varargs are the function's
                // own arguments, not script inputs.
                ReferenceKind::Positional(index) if !in_function => {
                    positionals.insert(index);
                }
                ReferenceKind::Vararg if !in_function => {
                    varargs = true;
                }
                ReferenceKind::Positional(_) | ReferenceKind::Vararg => {}
            }
        }
    }

    let mut variables = IndexMap::new();
    for name in used_names.iter().filter(|n| !defined_names.contains(*n)) {
        let class = match env.get(name) {
            Some(value) => VariableClass::EnvOptional(value.to_string()),
            None => VariableClass::Required,
        };
        variables.insert(name.clone(), class);
    }

    Classification {
        references,
        definitions,
        defined_names,
        variables,
        positionals,
        varargs,
    }
}

fn in_function_body(spans: &[FunctionSpan], line: usize) -> bool {
    spans.iter().any(|s| s.contains(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_text(text: &str, env: &[(&str, &str)]) -> Classification {
        let script = Script::parse(text);
        let env = EnvSnapshot::from_pairs(env.iter().copied());
        classify(&script, &env, &BTreeSet::new())
    }

    #[test]
    fn test_undefined_variable_is_required() {
        let c = classify_text("echo $NAME\n", &[]);
        assert_eq!(
            c.variables.get("NAME"),
            Some(&VariableClass::Required)
        );
    }

    #[test]
    fn test_environment_variable_is_optional_with_value() {
        let c = classify_text("echo $HOME_DIR\n", &[("HOME_DIR", "/home/u")]);
        assert_eq!(
            c.variables.get("HOME_DIR"),
            Some(&VariableClass::EnvOptional("/home/u".to_string()))
        );
        assert_eq!(c.env_optional_names(), vec!["HOME_DIR"]);
        assert!(c.required_names().is_empty());
    }

    #[test]
    fn test_defined_anywhere_excludes_from_surface() {
        // Definition after first use still counts: whole-script scope.
        let c = classify_text("echo $LATER\nLATER=5\n", &[]);
        assert!(c.variables.is_empty());
        assert!(c.defined_names.contains("LATER"));
    }

    #[test]
    fn test_loop_variable_not_on_surface() {
        let c = classify_text("for f in *.txt; do\n  echo $f\ndone\n", &[]);
        assert!(c.variables.is_empty());
    }

    #[test]
    fn test_read_variable_not_on_surface() {
        let c = classify_text("while read -r line; do\n  echo $line\ndone < in.txt\n", &[]);
        assert!(c.variables.is_empty());
    }

    #[test]
    fn test_script_level_positionals_and_varargs() {
        let c = classify_text("echo $1 ${2}\nrun $@\n", &[]);
        assert_eq!(c.positionals.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(c.varargs);
    }

    #[test]
    fn test_function_positionals_not_promoted() {
        let text = "greet() {\n  echo \"hi $1\"\n  echo \"$@\"\n}\ngreet world\n";
        let c = classify_text(text, &[]);
        assert!(c.positionals.is_empty());
        assert!(!c.varargs);
    }

    #[test]
    fn test_mixed_function_and_script_positionals() {
        let text = "greet() {\n  echo $1\n}\ngreet $1\necho $2\n";
        let c = classify_text(text, &[]);
        assert_eq!(c.positionals.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_excluded_iterators_treated_as_defined() {
        let script = Script::parse("echo $item\n");
        let excluded: BTreeSet<String> = ["item".to_string()].into();
        let c = classify(&script, &EnvSnapshot::empty(), &excluded);
        assert!(c.variables.is_empty());
    }

    #[test]
    fn test_variables_sorted_and_flagged_by_function() {
        let text = "f() {\n  echo $ZULU\n}\necho $ALPHA\n";
        let c = classify_text(text, &[]);
        let names: Vec<_> = c.variables.keys().cloned().collect();
        assert_eq!(names, vec!["ALPHA".to_string(), "ZULU".to_string()]);
        let zulu = c.references.iter().find(|r| r.name == "ZULU").unwrap();
        assert!(zulu.in_function);
        let alpha = c.references.iter().find(|r| r.name == "ALPHA").unwrap();
        assert!(!alpha.in_function);
    }

    #[test]
    fn test_unmatched_brace_never_aborts() {
        let c = classify_text("echo ${BROKEN\necho $OK\n", &[]);
        assert_eq!(c.variables.get("OK"), Some(&VariableClass::Required));
        assert!(!c.variables.contains_key("BROKEN"));
    }
}
