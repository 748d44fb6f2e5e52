//! Script analysis
//!
//! Read-only analysis over the raw script text: function spans,
//! definition sites, variable references, and the classifier that turns
//! them into the CLI-relevant variable surface.

pub mod classifier;
pub mod definitions;
pub mod functions;
pub mod references;

pub use classifier::{classify, Classification, VariableClass};
pub use definitions::{DefinitionCause, DefinitionSite};
pub use functions::FunctionSpan;
pub use references::{Reference, ReferenceForm, ReferenceKind};

use std::collections::HashMap;

/// Existence oracle over the process environment. The snapshot is taken
/// once at the start of a compilation and never refreshed or mutated; the
/// classifier only asks whether a name is present and what its value is.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}
