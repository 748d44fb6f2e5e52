//! sharg - shell script to self-describing CLI analysis engine
//!
//! This library reads a plain shell script and derives the command-line
//! interface it implies: undefined variables become options, positional
//! parameters become positional arguments, and comment-encoded
//! annotations and macros refine types, defaults, grouping, and
//! iteration behavior. The result is the expanded script text plus a
//! serializable argument specification for a CLI builder to consume.

pub mod analyzer;
pub mod annotations;
pub mod errors;
pub mod macros;
pub mod pipeline;
pub mod script;
pub mod types;

pub use analyzer::EnvSnapshot;
pub use errors::CompileError;
pub use pipeline::{
    analyze, build_spec, compile, compile_with_process_env, expand_macros, AnalysisOutput,
    ArgumentSpec, BuildOutput, CompileOutput, ExpansionOutput,
};
pub use script::Script;
