//! JSON exchange format of rules.
//!
//! Serialization is exact: a document produced by the editor reads back into
//! an editor that produces the same document. Reading is permissive:
//! - missing keys take defaults (`AND`, `false`, `""`, `[]`, `null`)
//! - scalar values of the wrong type are coerced or defaulted
//! - items and branches that cannot be read are skipped with a warning
//! - legacy keys are accepted: `expressions`, `type` (branch kind), `then`

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::arena::NodeArena;
use crate::domain::branch::BranchKind;
use crate::domain::error::DomainResult;
use crate::domain::node::{ConditionData, GroupData, Logic, NodeData, NodeId};

/// Node of the condition tree, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeDoc {
    Condition(ConditionDoc),
    Group(GroupDoc),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDoc {
    #[serde(default, deserialize_with = "lenient_string")]
    pub field: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub operator: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDoc {
    #[serde(default, deserialize_with = "lenient_logic")]
    pub logic: Logic,
    #[serde(
        rename = "expression",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_tag"
    )]
    pub branch_tag: Option<String>,
    #[serde(rename = "not", default, deserialize_with = "lenient_bool")]
    pub negate: bool,
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<NodeDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDoc {
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(default, deserialize_with = "lenient_nested")]
    pub nested: Option<Box<EditorDoc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBranchDoc")]
pub struct BranchDoc {
    pub kind: BranchKind,
    pub condition: Option<NodeDoc>,
    pub action: ActionDoc,
}

/// Branch as written, with current and legacy keys read side by side.
///
/// `kind` wins over `type` and `action` wins over `then`.
#[derive(Deserialize)]
struct RawBranchDoc {
    #[serde(default)]
    kind: Option<BranchKind>,
    #[serde(rename = "type", default)]
    legacy_kind: Option<BranchKind>,
    #[serde(default, deserialize_with = "lenient_condition")]
    condition: Option<NodeDoc>,
    #[serde(default)]
    action: Option<Value>,
    #[serde(rename = "then", default)]
    legacy_action: Option<Value>,
}

impl TryFrom<RawBranchDoc> for BranchDoc {
    type Error = String;

    fn try_from(raw: RawBranchDoc) -> Result<Self, Self::Error> {
        let kind = raw
            .kind
            .or(raw.legacy_kind)
            .ok_or_else(|| "branch without kind".to_string())?;
        let action = raw
            .action
            .or(raw.legacy_action)
            .map(action_from_value)
            .unwrap_or_default();
        Ok(Self {
            kind,
            condition: raw.condition,
            action,
        })
    }
}

impl BranchDoc {
    pub fn new(kind: BranchKind) -> Self {
        Self {
            kind,
            condition: None,
            action: ActionDoc::default(),
        }
    }
}

/// Whole rule: the ordered branch list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorDoc {
    #[serde(default, alias = "expressions", deserialize_with = "lenient_branches")]
    pub branches: Vec<BranchDoc>,
}

impl From<&ConditionData> for ConditionDoc {
    fn from(c: &ConditionData) -> Self {
        Self {
            field: c.field.clone(),
            operator: c.operator.clone(),
            value: c.value.clone(),
        }
    }
}

impl From<&ConditionDoc> for ConditionData {
    fn from(doc: &ConditionDoc) -> Self {
        ConditionData::new(&doc.field, &doc.operator, &doc.value)
    }
}

impl From<&GroupDoc> for GroupData {
    fn from(doc: &GroupDoc) -> Self {
        GroupData {
            logic: doc.logic,
            negate: doc.negate,
            branch_tag: doc.branch_tag.clone(),
        }
    }
}

impl NodeArena {
    /// Serialize the subtree rooted at `id`.
    pub fn to_doc(&self, id: NodeId) -> Option<NodeDoc> {
        let node = self.get(id)?;
        let doc = match &node.data {
            NodeData::Condition(c) => NodeDoc::Condition(c.into()),
            NodeData::Group(g) => NodeDoc::Group(GroupDoc {
                logic: g.logic,
                branch_tag: g.branch_tag.clone(),
                negate: g.negate,
                items: node
                    .children
                    .iter()
                    .filter_map(|&child| self.to_doc(child))
                    .collect(),
            }),
        };
        Some(doc)
    }

    /// Build a parentless group from `doc`, registering every node.
    pub fn insert_root_doc(&mut self, doc: &GroupDoc) -> NodeId {
        let root = self.insert_root(doc.into());
        self.insert_items(root, &doc.items);
        root
    }

    /// Build `doc` under `parent`, registering every node.
    pub fn insert_doc(&mut self, parent: NodeId, doc: &NodeDoc) -> DomainResult<NodeId> {
        match doc {
            NodeDoc::Condition(c) => self.add_condition(parent, c.into()),
            NodeDoc::Group(g) => {
                let id = self.add_group(parent, g.into())?;
                self.insert_items(id, &g.items);
                Ok(id)
            }
        }
    }

    fn insert_items(&mut self, group: NodeId, items: &[NodeDoc]) {
        for item in items {
            // group was created just above, so the parent always exists
            if let Err(e) = self.insert_doc(group, item) {
                warn!("skipping item under {}: {}", group, e);
            }
        }
    }
}

// ============================================================
// Permissive field readers
// ============================================================

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => {
            warn!("expected a string, got {}; using empty string", other);
            String::new()
        }
    })
}

fn lenient_tag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

fn lenient_logic<'de, D: Deserializer<'de>>(d: D) -> Result<Logic, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Logic::parse(&s).unwrap_or_else(|| {
            warn!("unknown logic {:?}; using AND", s);
            Logic::And
        }),
        _ => Logic::And,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn lenient_items<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<NodeDoc>, D::Error> {
    Ok(lenient_list(Value::deserialize(d)?, "item"))
}

fn lenient_branches<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<BranchDoc>, D::Error> {
    Ok(lenient_list(Value::deserialize(d)?, "branch"))
}

/// A branch condition is always a group, so an object without `type` is read as one.
fn lenient_condition<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NodeDoc>, D::Error> {
    let doc = match Value::deserialize(d)? {
        Value::Null => return Ok(None),
        Value::Object(map) if !map.contains_key("type") => {
            serde_json::from_value::<GroupDoc>(Value::Object(map)).map(NodeDoc::Group)
        }
        value => serde_json::from_value(value),
    };
    Ok(doc
        .map_err(|e| warn!("skipping unreadable condition: {}", e))
        .ok())
}

fn action_from_value(value: Value) -> ActionDoc {
    match value {
        Value::Null => ActionDoc::default(),
        Value::String(value) => ActionDoc {
            value,
            nested: None,
        },
        value => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("unreadable action: {}; using empty action", e);
            ActionDoc::default()
        }),
    }
}

fn lenient_nested<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Box<EditorDoc>>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        value => serde_json::from_value(value)
            .map_err(|e| warn!("skipping unreadable nested rule: {}", e))
            .ok(),
    })
}

fn lenient_list<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Vec<T> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .filter_map(|v| {
                serde_json::from_value(v)
                    .map_err(|e| warn!("skipping unreadable {}: {}", what, e))
                    .ok()
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            warn!("expected a list of {}s, got {}", what, other);
            Vec::new()
        }
    }
}
