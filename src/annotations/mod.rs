//! Annotation parsing
//!
//! Documentation-style comments that declare a variable's type, alias,
//! default and grouping for CLI generation, plus the group model built
//! from them.

pub mod groups;
pub mod parser;

pub use groups::{Group, GroupKind, GroupSet};
pub use parser::{
    parse_annotations, Annotation, GroupDecl, GroupName, ParsedComments,
};
