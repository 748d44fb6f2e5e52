//! Argument Groups
//!
//! Builds the `Group` / `ExclusiveGroup` entities from inline annotation
//! options and natural-language declarations. Both syntaxes populate the
//! same model. A variable may belong to at most one group, and never to
//! both kinds at once; violations are `GroupConstraintError`s.

use indexmap::IndexSet;
use serde::Serialize;

use crate::annotations::parser::GroupName;
use crate::errors::CompileError;

/// Whether members may be combined or are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Group,
    Exclusive,
}

impl GroupKind {
    fn auto_prefix(&self) -> &'static str {
        match self {
            Self::Group => "Group",
            Self::Exclusive => "ExclusiveGroup",
        }
    }
}

/// A named set of argument names, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub kind: GroupKind,
    pub members: IndexSet<String>,
}

/// Accumulates group memberships and enforces the membership invariants.
#[derive(Debug, Clone, Default)]
pub struct GroupSet {
    groups: Vec<Group>,
    auto_group_counter: usize,
    auto_exclusive_counter: usize,
}

impl GroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `variable` to the group identified by `name` (auto-generating
    /// a sequential name when none was given), enforcing that a variable
    /// belongs to at most one group of one kind.
    pub fn assign(
        &mut self,
        kind: GroupKind,
        name: &GroupName,
        variable: &str,
    ) -> Result<(), CompileError> {
        let group_name = match name {
            GroupName::Named(n) => n.clone(),
            GroupName::Auto => self.next_auto_name(kind),
        };

        for existing in &self.groups {
            if !existing.members.contains(variable) {
                continue;
            }
            if existing.name == group_name && existing.kind == kind {
                // Already a member of this exact group.
                return Ok(());
            }
            let message = if existing.kind == kind {
                format!(
                    "already in {} {:?}, cannot also join {:?}",
                    kind_word(existing.kind),
                    existing.name,
                    group_name
                )
            } else {
                format!(
                    "already in {} {:?}, cannot also join {} {:?}",
                    kind_word(existing.kind),
                    existing.name,
                    kind_word(kind),
                    group_name
                )
            };
            return Err(CompileError::group_constraint(variable, message));
        }

        if let Some(group) = self
            .groups
            .iter_mut()
            .find(|g| g.name == group_name && g.kind == kind)
        {
            group.members.insert(variable.to_string());
        } else {
            let mut members = IndexSet::new();
            members.insert(variable.to_string());
            self.groups.push(Group {
                name: group_name,
                kind,
                members,
            });
        }
        Ok(())
    }

    /// Add a whole declaration's members to one group under one name.
    pub fn assign_all(
        &mut self,
        kind: GroupKind,
        name: &GroupName,
        variables: &[String],
    ) -> Result<(), CompileError> {
        // Resolve the auto name once so every member lands together.
        let resolved = match name {
            GroupName::Named(n) => GroupName::Named(n.clone()),
            GroupName::Auto => GroupName::Named(self.next_auto_name(kind)),
        };
        for variable in variables {
            self.assign(kind, &resolved, variable)?;
        }
        Ok(())
    }

    fn next_auto_name(&mut self, kind: GroupKind) -> String {
        let counter = match kind {
            GroupKind::Group => {
                self.auto_group_counter += 1;
                self.auto_group_counter
            }
            GroupKind::Exclusive => {
                self.auto_exclusive_counter += 1;
                self.auto_exclusive_counter
            }
        };
        format!("{}{}", kind.auto_prefix(), counter)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<Group> {
        self.groups
    }
}

fn kind_word(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::Group => "group",
        GroupKind::Exclusive => "exclusive group",
    }
}
