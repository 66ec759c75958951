//! Rule editor: the ordered IF / ELSE IF / ELSE branches and their condition trees.
//!
//! Sequencing rules:
//! - at most one IF, always first
//! - ELSE IF and ELSE only after an IF and never after an ELSE
//! - at most one ELSE
//!
//! Every non-ELSE branch owns exactly one root group, every branch owns one
//! action value and optionally one nested editor with its own node registry.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::domain::arena::NodeArena;
use crate::domain::branch::{Action, BranchId, BranchKind, ExpressionBranch};
use crate::domain::document::{ActionDoc, BranchDoc, EditorDoc, NodeDoc};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::events::{ChangeObserver, ModelEvent};
use crate::domain::node::{ConditionData, GroupData, Logic, NodeId};
use crate::domain::options::EditorOptions;

/// Validation verdict with the offending branches and nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Branch order is structurally valid
    pub sequence_valid: bool,
    /// Branches failing for any reason (sequence, action, tree, nested rule)
    pub invalid_branches: Vec<BranchId>,
    /// Branches with a blank action value
    pub blank_actions: Vec<BranchId>,
    /// Invalid nodes of this editor, children before parents
    pub invalid_nodes: Vec<NodeId>,
    /// Reports of nested editors that failed
    pub nested: Vec<(BranchId, ValidationReport)>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.sequence_valid && self.invalid_branches.is_empty()
    }
}

pub struct RuleEditor {
    options: EditorOptions,
    branches: Vec<ExpressionBranch>,
    pub(super) nodes: NodeArena,
    last_branch_id: u64,
    /// Node of the active drag session
    pub(super) dragging: Option<NodeId>,
    /// Serial of the active drag session
    pub(super) drag_serial: u64,
    observers: Vec<Box<dyn ChangeObserver>>,
}

impl fmt::Debug for RuleEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEditor")
            .field("branches", &self.branches)
            .field("nodes", &self.nodes.len())
            .field("dragging", &self.dragging)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Default for RuleEditor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl RuleEditor {
    pub fn new(options: EditorOptions) -> Self {
        Self {
            options,
            branches: Vec::new(),
            nodes: NodeArena::new(),
            last_branch_id: 0,
            dragging: None,
            drag_serial: 0,
            observers: Vec::new(),
        }
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Registry of all condition nodes of this editor.
    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    pub fn branches(&self) -> &[ExpressionBranch] {
        &self.branches
    }

    pub fn branch(&self, id: BranchId) -> Option<&ExpressionBranch> {
        self.branches.iter().find(|b| b.id == id)
    }

    pub fn branch_index(&self, id: BranchId) -> Option<usize> {
        self.branches.iter().position(|b| b.id == id)
    }

    pub fn kinds(&self) -> Vec<BranchKind> {
        self.branches.iter().map(|b| b.kind).collect()
    }

    /// Branch whose root group is `node`.
    pub fn branch_of_root(&self, node: NodeId) -> Option<BranchId> {
        self.branches
            .iter()
            .find(|b| b.root == Some(node))
            .map(|b| b.id)
    }

    /// Number of nodes registered in this editor (nested editors excluded).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn subscribe(&mut self, observer: impl ChangeObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub(super) fn emit(&mut self, event: ModelEvent) {
        debug!(?event, "model changed");
        for observer in &mut self.observers {
            observer.on_change(&event);
        }
    }

    fn has_kind(&self, kind: BranchKind) -> bool {
        self.branches.iter().any(|b| b.kind == kind)
    }

    fn branch_position(&self, id: BranchId) -> DomainResult<usize> {
        self.branch_index(id).ok_or(DomainError::BranchNotFound(id))
    }

    // ============================================================
    // Branch sequencing
    // ============================================================

    /// Whether a branch of `kind` may be added now.
    pub fn can_add(&self, kind: BranchKind) -> bool {
        let has_if = self.has_kind(BranchKind::If);
        let has_else = self.has_kind(BranchKind::Else);
        match kind {
            BranchKind::If => !has_if,
            BranchKind::ElseIf | BranchKind::Else => has_if && !has_else,
        }
    }

    /// Add an empty branch. Returns `None` when sequencing refuses it.
    pub fn add_branch(&mut self, kind: BranchKind) -> Option<BranchId> {
        self.add_branch_from(&BranchDoc::new(kind))
    }

    /// Add a branch built from `doc`. Returns `None` when sequencing refuses it.
    ///
    /// IF goes to the front, everything else is appended. A missing condition
    /// yields a default root group; ELSE ignores any condition.
    #[instrument(level = "debug", skip(self, doc), fields(kind = %doc.kind))]
    pub fn add_branch_from(&mut self, doc: &BranchDoc) -> Option<BranchId> {
        let kind = doc.kind;
        if !self.can_add(kind) {
            debug!("refused {} for sequence {:?}", kind, self.kinds());
            return None;
        }

        let root = if kind.has_condition() {
            Some(self.root_from_doc(doc.condition.as_ref()))
        } else {
            None
        };
        let nested = doc
            .action
            .nested
            .as_deref()
            .map(|n| Box::new(RuleEditor::from_doc(n, self.options.clone())));

        self.last_branch_id += 1;
        let id = BranchId(self.last_branch_id);
        let branch = ExpressionBranch {
            id,
            kind,
            root,
            action: Action {
                value: doc.action.value.clone(),
                nested,
            },
        };
        if kind == BranchKind::If {
            self.branches.insert(0, branch);
        } else {
            self.branches.push(branch);
        }

        self.emit(ModelEvent::BranchAdded { branch: id, kind });
        Some(id)
    }

    fn root_from_doc(&mut self, doc: Option<&NodeDoc>) -> NodeId {
        match doc {
            Some(NodeDoc::Group(group)) => self.nodes.insert_root_doc(group),
            Some(leaf @ NodeDoc::Condition(_)) => {
                let root = self.nodes.insert_root(GroupData::default());
                if let Err(e) = self.nodes.insert_doc(root, leaf) {
                    warn!("dropping condition of new branch: {}", e);
                }
                root
            }
            None => self.nodes.insert_root(GroupData::default()),
        }
    }

    /// Remove a branch with its tree and nested editor.
    ///
    /// Without an IF the remaining branches are meaningless and are removed
    /// too. Removing an ELSE also removes anything that followed it.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_branch(&mut self, id: BranchId) -> bool {
        let Some(pos) = self.branch_index(id) else {
            return false;
        };
        let removed = self.branches.remove(pos);
        let removed_kind = removed.kind;
        self.destroy_branch(removed);

        let cascade: Vec<ExpressionBranch> = if !self.has_kind(BranchKind::If) {
            self.branches.drain(..).collect()
        } else if removed_kind == BranchKind::Else && pos < self.branches.len() {
            self.branches.drain(pos..).collect()
        } else {
            Vec::new()
        };
        if !cascade.is_empty() {
            debug!("cascading removal of {} branch(es)", cascade.len());
        }
        for branch in cascade {
            self.destroy_branch(branch);
        }
        true
    }

    fn destroy_branch(&mut self, branch: ExpressionBranch) {
        if let Some(root) = branch.root {
            self.nodes.remove_subtree(root);
        }
        if self.dragging.is_some_and(|n| !self.nodes.contains(n)) {
            self.dragging = None;
        }
        self.emit(ModelEvent::BranchRemoved {
            branch: branch.id,
            kind: branch.kind,
        });
    }

    // ============================================================
    // Condition tree edits
    // ============================================================

    pub fn add_condition(&mut self, group: NodeId, data: ConditionData) -> DomainResult<NodeId> {
        let node = self.nodes.add_condition(group, data)?;
        self.emit(ModelEvent::NodeAdded {
            parent: group,
            node,
        });
        Ok(node)
    }

    pub fn add_group(&mut self, group: NodeId, data: GroupData) -> DomainResult<NodeId> {
        let node = self.nodes.add_group(group, data)?;
        self.emit(ModelEvent::NodeAdded {
            parent: group,
            node,
        });
        Ok(node)
    }

    /// Remove `node` from the items of `group`. No-op if it is not an item there.
    pub fn remove_item(&mut self, group: NodeId, node: NodeId) -> DomainResult<bool> {
        if !self.nodes.remove_item(group, node)? {
            return Ok(false);
        }
        if self.dragging.is_some_and(|n| !self.nodes.contains(n)) {
            self.dragging = None;
        }
        self.emit(ModelEvent::NodeRemoved {
            parent: group,
            node,
        });
        Ok(true)
    }

    /// Remove any node. A root group is replaced by a fresh default group.
    pub fn remove_node(&mut self, node: NodeId) -> DomainResult<bool> {
        if let Some(branch) = self.branch_of_root(node) {
            self.remove_root_group(branch)?;
            return Ok(true);
        }
        match self.nodes.parent(node) {
            Some(parent) => self.remove_item(parent, node),
            None if self.nodes.contains(node) => Ok(false),
            None => Err(DomainError::NodeNotFound(node)),
        }
    }

    /// Replace the root of `branch` with an empty AND group.
    ///
    /// Returns the new root, or `None` for an ELSE branch.
    pub fn remove_root_group(&mut self, branch: BranchId) -> DomainResult<Option<NodeId>> {
        self.replace_root(branch, GroupData::default())
    }

    /// Replace the root of `branch` with a fresh empty group.
    ///
    /// Returns the new root, or `None` for an ELSE branch.
    #[instrument(level = "debug", skip(self))]
    pub fn replace_root(
        &mut self,
        branch: BranchId,
        data: GroupData,
    ) -> DomainResult<Option<NodeId>> {
        let pos = self.branch_position(branch)?;
        if !self.branches[pos].kind.has_condition() {
            return Ok(None);
        }
        if let Some(old) = self.branches[pos].root.take() {
            self.nodes.remove_subtree(old);
        }
        let root = self.nodes.insert_root(data);
        self.branches[pos].root = Some(root);
        if self.dragging.is_some_and(|n| !self.nodes.contains(n)) {
            self.dragging = None;
        }
        self.emit(ModelEvent::RootReset { branch, root });
        Ok(Some(root))
    }

    /// Select a field. Values outside the field options are refused.
    pub fn set_field(&mut self, node: NodeId, field: &str) -> DomainResult<bool> {
        self.nodes.condition(node)?;
        if !self.options.accepts_field(field) {
            debug!("refused unknown field {:?}", field);
            return Ok(false);
        }
        self.nodes.condition_mut(node)?.field = field.to_string();
        self.emit(ModelEvent::NodeChanged { node });
        Ok(true)
    }

    /// Select an operator. Values outside the operator options are refused.
    pub fn set_operator(&mut self, node: NodeId, operator: &str) -> DomainResult<bool> {
        self.nodes.condition(node)?;
        if !self.options.accepts_operator(operator) {
            debug!("refused unknown operator {:?}", operator);
            return Ok(false);
        }
        self.nodes.condition_mut(node)?.operator = operator.to_string();
        self.emit(ModelEvent::NodeChanged { node });
        Ok(true)
    }

    pub fn set_value(&mut self, node: NodeId, value: impl Into<String>) -> DomainResult<()> {
        self.nodes.condition_mut(node)?.value = value.into();
        self.emit(ModelEvent::NodeChanged { node });
        Ok(())
    }

    pub fn set_logic(&mut self, group: NodeId, logic: Logic) -> DomainResult<()> {
        self.nodes.group_mut(group)?.logic = logic;
        self.emit(ModelEvent::NodeChanged { node: group });
        Ok(())
    }

    pub fn set_negate(&mut self, group: NodeId, negate: bool) -> DomainResult<()> {
        self.nodes.group_mut(group)?.negate = negate;
        self.emit(ModelEvent::NodeChanged { node: group });
        Ok(())
    }

    /// Flip negation and return the new flag.
    pub fn toggle_not(&mut self, group: NodeId) -> DomainResult<bool> {
        let data = self.nodes.group_mut(group)?;
        data.negate = !data.negate;
        let negate = data.negate;
        self.emit(ModelEvent::NodeChanged { node: group });
        Ok(negate)
    }

    pub fn set_branch_tag(&mut self, group: NodeId, tag: Option<String>) -> DomainResult<()> {
        self.nodes.group_mut(group)?.branch_tag = tag.filter(|t| !t.is_empty());
        self.emit(ModelEvent::NodeChanged { node: group });
        Ok(())
    }

    // ============================================================
    // Actions and nested rules
    // ============================================================

    pub fn set_action_value(
        &mut self,
        branch: BranchId,
        value: impl Into<String>,
    ) -> DomainResult<()> {
        let pos = self.branch_position(branch)?;
        self.branches[pos].action.value = value.into();
        self.emit(ModelEvent::ActionChanged { branch });
        Ok(())
    }

    /// Attach an empty nested editor to the action. No-op if one exists.
    pub fn add_nested_editor(&mut self, branch: BranchId) -> DomainResult<bool> {
        let pos = self.branch_position(branch)?;
        if self.branches[pos].action.nested.is_some() {
            return Ok(false);
        }
        let nested = RuleEditor::new(self.options.clone());
        self.branches[pos].action.nested = Some(Box::new(nested));
        self.emit(ModelEvent::NestedChanged { branch });
        Ok(true)
    }

    pub fn remove_nested_editor(&mut self, branch: BranchId) -> DomainResult<bool> {
        let pos = self.branch_position(branch)?;
        if self.branches[pos].action.nested.take().is_none() {
            return Ok(false);
        }
        self.emit(ModelEvent::NestedChanged { branch });
        Ok(true)
    }

    pub fn nested_editor(&self, branch: BranchId) -> Option<&RuleEditor> {
        self.branch(branch).and_then(|b| b.action.nested())
    }

    pub fn nested_editor_mut(&mut self, branch: BranchId) -> Option<&mut RuleEditor> {
        self.branches
            .iter_mut()
            .find(|b| b.id == branch)
            .and_then(|b| b.action.nested.as_deref_mut())
    }

    // ============================================================
    // Validation
    // ============================================================

    pub fn validate_sequence(&self) -> bool {
        BranchKind::sequence_is_valid(&self.kinds())
    }

    /// True iff the sequence is valid and every branch has a non-blank action,
    /// a valid condition tree (when it needs one) and a valid nested rule.
    pub fn validate(&self) -> bool {
        self.validation_report().is_valid()
    }

    pub fn validation_report(&self) -> ValidationReport {
        let sequence_valid = self.validate_sequence();
        let mut report = ValidationReport {
            sequence_valid,
            invalid_branches: Vec::new(),
            blank_actions: Vec::new(),
            invalid_nodes: Vec::new(),
            nested: Vec::new(),
        };

        for branch in &self.branches {
            let mut valid = sequence_valid;
            match branch.root {
                Some(root) => {
                    let invalid = self.nodes.invalid_nodes(root);
                    valid &= invalid.is_empty();
                    report.invalid_nodes.extend(invalid);
                }
                None => valid &= !branch.kind.has_condition(),
            }
            if branch.action.is_blank() {
                report.blank_actions.push(branch.id);
                valid = false;
            }
            if let Some(nested) = branch.action.nested() {
                let nested_report = nested.validation_report();
                if !nested_report.is_valid() {
                    report.nested.push((branch.id, nested_report));
                    valid = false;
                }
            }
            if !valid {
                report.invalid_branches.push(branch.id);
            }
        }
        report
    }

    // ============================================================
    // Serialization
    // ============================================================

    pub fn to_doc(&self) -> EditorDoc {
        EditorDoc {
            branches: self
                .branches
                .iter()
                .map(|b| BranchDoc {
                    kind: b.kind,
                    condition: b.root.and_then(|root| self.nodes.to_doc(root)),
                    action: ActionDoc {
                        value: b.action.value.clone(),
                        nested: b.action.nested().map(|n| Box::new(n.to_doc())),
                    },
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> DomainResult<Value> {
        Ok(serde_json::to_value(self.to_doc())?)
    }

    pub fn to_json_string(&self, pretty: bool) -> DomainResult<String> {
        let doc = self.to_doc();
        let json = if pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        Ok(json)
    }

    /// Subtree rooted at `node` in exchange format.
    pub fn node_doc(&self, node: NodeId) -> DomainResult<NodeDoc> {
        self.nodes
            .to_doc(node)
            .ok_or(DomainError::NodeNotFound(node))
    }

    /// Rebuild an editor from a document, replaying branches in order.
    ///
    /// Branches the sequencing rules refuse are skipped with a warning.
    pub fn from_doc(doc: &EditorDoc, options: EditorOptions) -> Self {
        let mut editor = Self::new(options);
        for branch in &doc.branches {
            if editor.add_branch_from(branch).is_none() {
                warn!(
                    "skipping {} branch: not allowed after {:?}",
                    branch.kind,
                    editor.kinds()
                );
            }
        }
        editor
    }

    pub fn from_json(value: Value, options: EditorOptions) -> DomainResult<Self> {
        let doc: EditorDoc = serde_json::from_value(value)?;
        Ok(Self::from_doc(&doc, options))
    }

    /// Parse a document of any nesting depth; whatever `to_json_string` writes reads back.
    pub fn from_json_str(json: &str, options: EditorOptions) -> DomainResult<Self> {
        let mut de = serde_json::Deserializer::from_str(json);
        de.disable_recursion_limit();
        let doc = EditorDoc::deserialize(&mut de)?;
        de.end()?;
        Ok(Self::from_doc(&doc, options))
    }
}
