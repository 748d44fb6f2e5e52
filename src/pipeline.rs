//! Compilation Pipeline
//!
//! The ordered stages Analyze → Build-Spec → Macro-Expand, each with a
//! narrow read/write contract carried by its own output type:
//! - [`analyze`] may read the script (and the environment snapshot) and
//!   writes the variable/definition sets plus raw parsed comments
//! - [`build_spec`] may read the analysis output and the type registry
//!   and writes argument specs and groups
//! - [`expand_macros`] may read both prior outputs and writes the
//!   expanded script plus the excluded-iterator set
//!
//! No stage reaches into a later stage's state and nothing is shared
//! mutable: each stage hands its output forward by value. [`compile`]
//! runs the whole sequence, finishing with the reclassification pass
//! over the expanded text so loop-bound iterator variables never appear
//! on the CLI surface.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::analyzer::{self, classifier, Classification, EnvSnapshot, VariableClass};
use crate::annotations::{self, Annotation, GroupDecl, GroupKind, GroupSet, ParsedComments};
use crate::errors::CompileError;
use crate::macros;
use crate::script::Script;
use crate::types::{CliShape, TypeId, TypeRegistry};

/// Output of the Analyze stage.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub script: Script,
    pub classification: Classification,
    pub comments: ParsedComments,
    /// Interpreter command derived from the shebang.
    pub shell_cmd: Vec<String>,
}

/// One CLI argument derived from a variable and its annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub type_id: TypeId,
    pub cli_shape: CliShape,
    /// Always a single leading dash.
    pub alias: Option<String>,
    pub description: String,
    pub default: Option<String>,
    pub choices: Option<Vec<String>>,
    pub group: Option<String>,
    pub exclusive_group: Option<String>,
    /// No default and no environment backing means the user must supply
    /// the value.
    pub required: bool,
}

/// Output of the Build-Spec stage.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub arguments: Vec<ArgumentSpec>,
    pub groups: Vec<annotations::Group>,
    pub positionals: Vec<u32>,
    pub varargs: bool,
    /// Variables whose type carries the file-line iteration hint, for
    /// the macro engine's default-strategy selection.
    pub file_typed: BTreeSet<String>,
    pub description: Option<String>,
}

/// Output of the Macro-Expand stage.
#[derive(Debug, Clone)]
pub struct ExpansionOutput {
    pub script: Script,
    pub excluded_iterators: BTreeSet<String>,
    pub strict: bool,
}

/// The assembled hand-off to the external CLI builder and compiler.
#[derive(Debug, Clone, Serialize)]
pub struct CompileOutput {
    pub arguments: Vec<ArgumentSpec>,
    pub groups: Vec<annotations::Group>,
    pub positionals: Vec<u32>,
    pub varargs: bool,
    pub expanded_text: String,
    pub excluded_iterators: BTreeSet<String>,
    pub shell_cmd: Vec<String>,
    pub description: Option<String>,
}

/// Analyze the raw script text: classify variables, collect definition
/// sites, parse annotation comments, detect the interpreter.
pub fn analyze(script_text: &str, env: &EnvSnapshot) -> Result<AnalysisOutput, CompileError> {
    let script = Script::parse(script_text);
    let classification = classifier::classify(&script, env, &BTreeSet::new());
    let comments = annotations::parse_annotations(&script)?;
    let shell_cmd = detect_shell(&script);
    Ok(AnalysisOutput {
        script,
        classification,
        comments,
        shell_cmd,
    })
}

/// Normalize the shebang to a known shell command, defaulting to bash.
fn detect_shell(script: &Script) -> Vec<String> {
    let shell = match script.shebang() {
        Some(shebang) => {
            let interp = shebang[2..].trim();
            if interp.contains("bash") {
                "/bin/bash"
            } else if interp.contains("zsh") {
                "/bin/zsh"
            } else if interp.contains("ksh") {
                "/bin/ksh"
            } else if interp.contains("dash") || interp.contains("sh") {
                "/bin/sh"
            } else {
                "/bin/bash"
            }
        }
        None => "/bin/bash",
    };
    vec![shell.to_string()]
}

/// Build the argument specification from a classification and the parsed
/// comments. Also used for the final pass over the expanded script.
fn build_spec_from(
    classification: &Classification,
    comments: &ParsedComments,
) -> Result<BuildOutput, CompileError> {
    let registry = TypeRegistry::new();
    let mut groups = GroupSet::new();
    let mut arguments = Vec::new();
    let mut file_typed = BTreeSet::new();

    for (name, class) in &classification.variables {
        let annotation = comments.annotations.get(name);
        let spec = build_argument(name, class, annotation, &registry, &mut groups)?;
        if spec.type_id == TypeId::File {
            file_typed.insert(name.clone());
        }
        arguments.push(spec);
    }

    for decl in &comments.group_decls {
        apply_group_decl(decl, &mut groups)?;
    }

    resolve_group_names(&mut arguments, &groups);

    Ok(BuildOutput {
        arguments,
        groups: groups.into_groups(),
        positionals: classification.positionals.iter().copied().collect(),
        varargs: classification.varargs,
        file_typed,
        description: comments.script_description.clone(),
    })
}

/// Build the argument specification for the analyzed script.
pub fn build_spec(analysis: &AnalysisOutput) -> Result<BuildOutput, CompileError> {
    build_spec_from(&analysis.classification, &analysis.comments)
}

fn build_argument(
    name: &str,
    class: &VariableClass,
    annotation: Option<&Annotation>,
    registry: &TypeRegistry,
    groups: &mut GroupSet,
) -> Result<ArgumentSpec, CompileError> {
    let (line, type_name) = match annotation {
        Some(ann) => (ann.line, ann.type_name.as_deref().unwrap_or("str")),
        None => (0, "str"),
    };
    let handler = registry.lookup(type_name).ok_or_else(|| {
        CompileError::type_validation(line, type_name, "unknown type name")
    })?;

    let choices = annotation.and_then(|a| a.choices.clone());
    if handler.requires_params && choices.as_ref().map_or(true, |c| c.is_empty()) {
        return Err(CompileError::type_validation(
            line,
            handler.type_id.canonical_name(),
            "a bracketed value list is required, e.g. (choice[a, b])",
        ));
    }

    // An annotation-declared default always beats the environment value;
    // the environment is consulted only when the annotation is silent.
    let annotated_default = annotation.and_then(|a| a.default.clone());
    let default = match (&annotated_default, class) {
        (Some(value), _) => Some(value.clone()),
        (None, VariableClass::EnvOptional(value)) => Some(value.clone()),
        (None, VariableClass::Required) => None,
    };

    if let Some(value) = &annotated_default {
        handler
            .validate_value(value, choices.as_deref())
            .map_err(|message| {
                CompileError::type_validation(line, handler.type_id.canonical_name(), message)
            })?;
    }

    if let Some(ann) = annotation {
        if let Some(group) = &ann.group {
            groups.assign(GroupKind::Group, group, name)?;
        }
        if let Some(exclusive) = &ann.exclusive_group {
            groups.assign(GroupKind::Exclusive, exclusive, name)?;
        }
    }

    Ok(ArgumentSpec {
        name: name.to_string(),
        type_id: handler.type_id,
        cli_shape: handler.cli_shape(default.as_deref()),
        alias: annotation.and_then(|a| a.alias.clone()),
        description: annotation.map(|a| a.description.clone()).unwrap_or_default(),
        required: default.is_none(),
        default,
        choices,
        group: None,
        exclusive_group: None,
    })
}

fn apply_group_decl(decl: &GroupDecl, groups: &mut GroupSet) -> Result<(), CompileError> {
    let kind = if decl.exclusive {
        GroupKind::Exclusive
    } else {
        GroupKind::Group
    };
    groups.assign_all(kind, &decl.name, &decl.members)
}

/// Stamp resolved group names onto the argument specs.
fn resolve_group_names(arguments: &mut [ArgumentSpec], groups: &GroupSet) {
    for group in groups.groups() {
        for member in &group.members {
            if let Some(spec) = arguments.iter_mut().find(|a| &a.name == member) {
                match group.kind {
                    GroupKind::Group => spec.group = Some(group.name.clone()),
                    GroupKind::Exclusive => spec.exclusive_group = Some(group.name.clone()),
                }
            }
        }
    }
}

/// Expand all macros in the analyzed script.
pub fn expand_macros(
    analysis: &AnalysisOutput,
    build: &BuildOutput,
) -> Result<ExpansionOutput, CompileError> {
    let expansion = macros::expand(&analysis.script, &build.file_typed)?;
    Ok(ExpansionOutput {
        script: expansion.script,
        excluded_iterators: expansion.iterators,
        strict: expansion.strict,
    })
}

/// Run the whole pipeline over one script.
pub fn compile(script_text: &str, env: &EnvSnapshot) -> Result<CompileOutput, CompileError> {
    let analysis = analyze(script_text, env)?;
    let build = build_spec(&analysis)?;
    let expansion = expand_macros(&analysis, &build)?;

    // Reclassify over the expanded text: loop headers generated by the
    // macro engine bind their iterators, and the recorded iterator set
    // covers call-target loops whose binding line mentions no `read`.
    let final_classification = classifier::classify(
        &expansion.script,
        env,
        &expansion.excluded_iterators,
    );
    let final_build = build_spec_from(&final_classification, &analysis.comments)?;

    Ok(CompileOutput {
        arguments: final_build.arguments,
        groups: final_build.groups,
        positionals: final_build.positionals,
        varargs: final_build.varargs,
        expanded_text: expansion.script.text(),
        excluded_iterators: expansion.excluded_iterators,
        shell_cmd: analysis.shell_cmd,
        description: final_build.description,
    })
}

/// Convenience wrapper using a snapshot of the live process environment.
pub fn compile_with_process_env(script_text: &str) -> Result<CompileOutput, CompileError> {
    compile(script_text, &analyzer::EnvSnapshot::from_process())
}
