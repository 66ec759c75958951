//! Decision branches: IF / ELSE IF / ELSE slots of a rule.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::editor::RuleEditor;
use crate::domain::node::NodeId;

/// Handle of a branch inside one editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchId(pub(crate) u64);

impl BranchId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "branch-{}", self.0)
    }
}

/// Kind of a branch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchKind {
    #[serde(rename = "IF")]
    If,
    #[serde(rename = "ELSEIF", alias = "ELSE IF", alias = "ELSE_IF")]
    ElseIf,
    #[serde(rename = "ELSE")]
    Else,
}

impl BranchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchKind::If => "IF",
            BranchKind::ElseIf => "ELSEIF",
            BranchKind::Else => "ELSE",
        }
    }

    /// Label used in rendered output.
    pub fn label(self) -> &'static str {
        match self {
            BranchKind::If => "IF",
            BranchKind::ElseIf => "ELSE IF",
            BranchKind::Else => "ELSE",
        }
    }

    /// Every kind except ELSE owns a condition tree.
    pub fn has_condition(self) -> bool {
        !matches!(self, BranchKind::Else)
    }

    /// Structural check of a branch order.
    ///
    /// Empty is valid. Otherwise the first kind is IF, there is no second IF,
    /// at most one ELSE, and nothing follows an ELSE.
    pub fn sequence_is_valid(kinds: &[BranchKind]) -> bool {
        match kinds.first() {
            None => return true,
            Some(BranchKind::If) => {}
            Some(_) => return false,
        }
        let mut seen_else = false;
        for &kind in &kinds[1..] {
            if seen_else || kind == BranchKind::If {
                return false;
            }
            if kind == BranchKind::Else {
                seen_else = true;
            }
        }
        true
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// THEN part of a branch: a returned value and an optional nested rule.
#[derive(Debug, Default)]
pub struct Action {
    pub(crate) value: String,
    pub(crate) nested: Option<Box<RuleEditor>>,
}

impl Action {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn nested(&self) -> Option<&RuleEditor> {
        self.nested.as_deref()
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// One slot of the decision sequence.
#[derive(Debug)]
pub struct ExpressionBranch {
    pub(crate) id: BranchId,
    pub(crate) kind: BranchKind,
    /// Root group; None only for ELSE
    pub(crate) root: Option<NodeId>,
    pub(crate) action: Action,
}

impl ExpressionBranch {
    pub fn id(&self) -> BranchId {
        self.id
    }

    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn action(&self) -> &Action {
        &self.action
    }
}
