//! Type Registry
//!
//! Canonical table of argument value types. The table is fixed at startup:
//! callers look handlers up by any (case-insensitive) alias but can never
//! register or replace a handler at runtime. Each handler knows how to
//! validate a raw string value and what CLI shape the argument takes.
//!
//! The `file` type additionally carries the hint, consumed by the macro
//! engine, that a variable of this type used as an iteration source
//! defaults to line-by-line file iteration.

use std::collections::HashMap;

use serde::Serialize;

/// Canonical type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeId {
    Str,
    Int,
    Float,
    Bool,
    Choice,
    File,
}

impl TypeId {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Choice => "choice",
            Self::File => "file",
        }
    }
}

/// How an argument of a given type appears on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CliShape {
    /// Bare flag; presence stores a fixed boolean. `stores` is the value
    /// presence sets: default `false` means presence sets `true`, and a
    /// declared default of `true` flips it.
    Flag { stores: bool },
    /// Takes one value.
    Valued,
    /// Takes one value constrained to a declared choice set.
    ChoiceOf,
}

/// A validated, converted argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Descriptor for one argument type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHandler {
    pub type_id: TypeId,
    pub aliases: &'static [&'static str],
    /// Whether a bracketed value list is required after the type name.
    pub requires_params: bool,
    /// When a variable of this type is an iteration macro's source and no
    /// explicit strategy is given, iterate the named file line by line.
    pub iterates_file_lines: bool,
}

impl TypeHandler {
    /// Validate and convert a raw string value. `choices` is the declared
    /// choice set for choice-typed arguments, ignored otherwise. Returns a
    /// human-readable message on failure; the caller attaches location
    /// context.
    pub fn validate_value(&self, raw: &str, choices: Option<&[String]>) -> Result<Value, String> {
        match self.type_id {
            TypeId::Str => Ok(Value::Str(raw.to_string())),
            TypeId::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("{:?} is not an integer", raw)),
            TypeId::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("{:?} is not a number", raw)),
            TypeId::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "n" => Ok(Value::Bool(false)),
                _ => Err(format!("{:?} is not a boolean", raw)),
            },
            TypeId::Choice => {
                let choices = choices.unwrap_or(&[]);
                if choices.iter().any(|c| c == raw) {
                    Ok(Value::Str(raw.to_string()))
                } else {
                    Err(format!(
                        "{:?} is not one of [{}]",
                        raw,
                        choices.join(", ")
                    ))
                }
            }
            // Format-only validation: paths are opaque strings to the
            // core, but they cannot be empty or span lines.
            TypeId::File => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Err("file path is empty".to_string())
                } else if trimmed.contains('\n') {
                    Err("file path contains a newline".to_string())
                } else {
                    Ok(Value::Str(raw.to_string()))
                }
            }
        }
    }

    /// The CLI shape for an argument of this type, given its declared
    /// default (only booleans inspect it).
    pub fn cli_shape(&self, default: Option<&str>) -> CliShape {
        match self.type_id {
            TypeId::Bool => {
                let default_true = matches!(
                    default.map(str::trim).map(str::to_ascii_lowercase).as_deref(),
                    Some("true") | Some("1") | Some("yes") | Some("y")
                );
                // Presence flips the default.
                CliShape::Flag {
                    stores: !default_true,
                }
            }
            TypeId::Choice => CliShape::ChoiceOf,
            _ => CliShape::Valued,
        }
    }
}

const HANDLERS: &[TypeHandler] = &[
    TypeHandler {
        type_id: TypeId::Str,
        aliases: &["str", "string", "text"],
        requires_params: false,
        iterates_file_lines: false,
    },
    TypeHandler {
        type_id: TypeId::Int,
        aliases: &["int", "integer", "number"],
        requires_params: false,
        iterates_file_lines: false,
    },
    TypeHandler {
        type_id: TypeId::Float,
        aliases: &["float", "decimal", "real"],
        requires_params: false,
        iterates_file_lines: false,
    },
    TypeHandler {
        type_id: TypeId::Bool,
        aliases: &["bool", "boolean", "flag"],
        requires_params: false,
        iterates_file_lines: false,
    },
    TypeHandler {
        type_id: TypeId::Choice,
        aliases: &["choice", "enum", "select", "option"],
        requires_params: true,
        iterates_file_lines: false,
    },
    TypeHandler {
        type_id: TypeId::File,
        aliases: &["file", "path", "filepath"],
        requires_params: false,
        iterates_file_lines: true,
    },
];

lazy_static::lazy_static! {
    /// Lowercased alias → handler index into `HANDLERS`.
    static ref ALIAS_TABLE: HashMap<&'static str, usize> = {
        let mut m = HashMap::new();
        for (idx, handler) in HANDLERS.iter().enumerate() {
            for alias in handler.aliases {
                m.insert(*alias, idx);
            }
        }
        m
    };
}

/// Lookup facade over the fixed handler table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeRegistry;

impl TypeRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Case-insensitive lookup by canonical name or alias.
    pub fn lookup(&self, name: &str) -> Option<&'static TypeHandler> {
        ALIAS_TABLE
            .get(name.to_ascii_lowercase().as_str())
            .map(|idx| &HANDLERS[*idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.lookup("INT").unwrap().type_id, TypeId::Int);
        assert_eq!(registry.lookup("Integer").unwrap().type_id, TypeId::Int);
        assert_eq!(registry.lookup("number").unwrap().type_id, TypeId::Int);
    }

    #[test]
    fn test_every_alias_resolves() {
        let registry = TypeRegistry::new();
        for (alias, id) in [
            ("string", TypeId::Str),
            ("text", TypeId::Str),
            ("decimal", TypeId::Float),
            ("real", TypeId::Float),
            ("flag", TypeId::Bool),
            ("enum", TypeId::Choice),
            ("select", TypeId::Choice),
            ("option", TypeId::Choice),
            ("path", TypeId::File),
            ("filepath", TypeId::File),
        ] {
            assert_eq!(registry.lookup(alias).unwrap().type_id, id, "{}", alias);
        }
    }

    #[test]
    fn test_unknown_type_is_none() {
        assert!(TypeRegistry::new().lookup("prt").is_none());
    }

    #[test]
    fn test_int_validation() {
        let handler = TypeRegistry::new().lookup("int").unwrap();
        assert_eq!(handler.validate_value("42", None), Ok(Value::Int(42)));
        assert!(handler.validate_value("4.2", None).is_err());
        assert!(handler.validate_value("abc", None).is_err());
    }

    #[test]
    fn test_bool_validation_accepts_common_spellings() {
        let handler = TypeRegistry::new().lookup("bool").unwrap();
        assert_eq!(handler.validate_value("TRUE", None), Ok(Value::Bool(true)));
        assert_eq!(handler.validate_value("0", None), Ok(Value::Bool(false)));
        assert!(handler.validate_value("maybe", None).is_err());
    }

    #[test]
    fn test_choice_membership() {
        let handler = TypeRegistry::new().lookup("choice").unwrap();
        let choices = vec!["red".to_string(), "green".to_string()];
        assert_eq!(
            handler.validate_value("red", Some(&choices)),
            Ok(Value::Str("red".to_string()))
        );
        let err = handler.validate_value("blue", Some(&choices)).unwrap_err();
        assert!(err.contains("red, green"));
    }

    #[test]
    fn test_file_format_only_validation() {
        let handler = TypeRegistry::new().lookup("file").unwrap();
        assert!(handler.validate_value("/tmp/x.log", None).is_ok());
        assert!(handler.validate_value("does/not/need/to/exist", None).is_ok());
        assert!(handler.validate_value("  ", None).is_err());
        assert!(handler.iterates_file_lines);
    }

    #[test]
    fn test_bool_cli_shape_flips_on_true_default() {
        let handler = TypeRegistry::new().lookup("bool").unwrap();
        assert_eq!(handler.cli_shape(None), CliShape::Flag { stores: true });
        assert_eq!(
            handler.cli_shape(Some("false")),
            CliShape::Flag { stores: true }
        );
        assert_eq!(
            handler.cli_shape(Some("true")),
            CliShape::Flag { stores: false }
        );
    }
}
