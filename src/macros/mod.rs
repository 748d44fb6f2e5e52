//! Macro engine
//!
//! Comment-encoded directives (iteration loops, strict mode, cleanup
//! traps) that expand into plain shell code before execution. The parser
//! recognizes macro comments, the resolver finds the code region each
//! macro governs, and the generator emits the equivalent shell text.

pub mod codegen;
pub mod parser;
pub mod resolver;
pub mod types;

pub use resolver::{expand, MacroExpansion};
pub use types::{IterationSpec, MacroComment, MacroKind};
