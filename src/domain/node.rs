//! Node payloads of the condition tree: leaf conditions and boolean groups.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Registry id of a node inside one editor.
///
/// Ids are handed out monotonically by the owning [`NodeArena`](crate::domain::NodeArena)
/// and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cb-{}", self.0)
    }
}

/// Boolean combinator of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Logic {
    pub fn as_str(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }

    /// Case-insensitive parse; anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Logic::And),
            "OR" => Some(Logic::Or),
            _ => None,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf predicate: `field operator value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionData {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl ConditionData {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// A condition is complete when field and operator are selected and the
    /// value is not blank.
    pub fn is_complete(&self) -> bool {
        !self.field.is_empty() && !self.operator.is_empty() && !self.value.trim().is_empty()
    }
}

impl fmt::Display for ConditionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |s: &str| if s.is_empty() { "?".to_string() } else { s.to_string() };
        write!(
            f,
            "{} {} {}",
            part(&self.field),
            part(&self.operator),
            part(self.value.trim())
        )
    }
}

/// Composite node settings. The children live in the arena node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupData {
    pub logic: Logic,
    /// Negates the combined result, not the individual items.
    pub negate: bool,
    /// Optional label naming the branch this group belongs to.
    pub branch_tag: Option<String>,
}

impl GroupData {
    pub fn with_logic(logic: Logic) -> Self {
        Self {
            logic,
            ..Self::default()
        }
    }
}

impl fmt::Display for GroupData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negate {
            f.write_str("NOT ")?;
        }
        f.write_str(self.logic.as_str())?;
        if let Some(tag) = &self.branch_tag {
            write!(f, " ({tag} group)")?;
        }
        Ok(())
    }
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Condition(ConditionData),
    Group(GroupData),
}

impl NodeData {
    pub fn is_group(&self) -> bool {
        matches!(self, NodeData::Group(_))
    }

    pub fn as_group(&self) -> Option<&GroupData> {
        match self {
            NodeData::Group(g) => Some(g),
            NodeData::Condition(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupData> {
        match self {
            NodeData::Group(g) => Some(g),
            NodeData::Condition(_) => None,
        }
    }

    pub fn as_condition(&self) -> Option<&ConditionData> {
        match self {
            NodeData::Condition(c) => Some(c),
            NodeData::Group(_) => None,
        }
    }

    pub fn as_condition_mut(&mut self) -> Option<&mut ConditionData> {
        match self {
            NodeData::Condition(c) => Some(c),
            NodeData::Group(_) => None,
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeData::Condition(c) => c.fmt(f),
            NodeData::Group(g) => g.fmt(f),
        }
    }
}
