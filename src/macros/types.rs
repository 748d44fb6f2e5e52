//! Macro Data Model
//!
//! Parsed macro comments, shared by the parser, resolver and generator.

/// A parsed `# for …` iteration macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationSpec {
    /// Loop-bound variable name.
    pub iterator: String,
    /// Source expression, verbatim as written.
    pub source: String,
    /// Explicit `as TYPE` override.
    pub type_override: Option<String>,
    /// `sep S` / `separated by S` separator with escape sequences decoded.
    pub separator: Option<String>,
    /// `| with …` literal parameters, in order.
    pub extra_params: Vec<String>,
    /// `-> FUNC` call target.
    pub call_target: Option<String>,
}

/// The directive a macro comment encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroKind {
    Iteration(IterationSpec),
    EndFor,
    Strict,
    TrapCleanup { signals: Vec<String> },
}

/// One recognized macro comment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroComment {
    /// 1-based line number of the comment.
    pub line: usize,
    /// The comment's own leading whitespace, reused for generated code.
    pub indent: String,
    pub kind: MacroKind,
    pub raw: String,
}
