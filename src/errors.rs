//! Compilation Errors
//!
//! Every failure the compiler can produce, as one public enum. All errors
//! are fatal to the whole compilation: no partially expanded script or
//! partial argument list is ever handed to a caller. Each variant carries
//! enough context (line number, offending text, and for conflicts both
//! competing locations plus a suggested fix) that the script author can
//! correct the input without re-deriving the cause.

use thiserror::Error;

/// Errors raised while analyzing a script, building its argument
/// specification, or expanding its macros.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A malformed annotation or macro comment line.
    #[error("syntax error at line {line}: {message}: {text:?}")]
    Syntax {
        line: usize,
        text: String,
        message: String,
    },

    /// Two macros resolved to overlapping targets, or a function carries
    /// both a preceding macro and internal macros.
    #[error("macro conflict between lines {first_line} and {second_line}: {message}. {suggestion}")]
    Conflict {
        first_line: usize,
        second_line: usize,
        message: String,
        suggestion: String,
    },

    /// An unknown type name, or a value that fails its type's validator.
    #[error("invalid value for type {type_name} at line {line}: {message}")]
    TypeValidation {
        line: usize,
        type_name: String,
        message: String,
    },

    /// A variable placed in two groups, or in both a group and an
    /// exclusive group.
    #[error("group constraint violated for {variable}: {message}")]
    GroupConstraint { variable: String, message: String },

    /// A macro with no resolvable following code (e.g. at end of file).
    #[error("no target found for macro at line {line}: {text:?}")]
    UnresolvedTarget { line: usize, text: String },
}

impl CompileError {
    pub fn syntax(line: usize, text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            text: text.into(),
            message: message.into(),
        }
    }

    pub fn conflict(
        first_line: usize,
        second_line: usize,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            first_line,
            second_line,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn type_validation(
        line: usize,
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TypeValidation {
            line,
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn group_constraint(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GroupConstraint {
            variable: variable.into(),
            message: message.into(),
        }
    }

    pub fn unresolved_target(line: usize, text: impl Into<String>) -> Self {
        Self::UnresolvedTarget {
            line,
            text: text.into(),
        }
    }
}
