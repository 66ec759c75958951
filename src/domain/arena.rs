use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::{debug, instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{ConditionData, GroupData, NodeData, NodeId};

/// Tree node in the arena-based condition tree.
#[derive(Debug)]
pub struct TreeNode {
    /// Registry id of this node
    pub id: NodeId,
    /// Condition or group payload
    pub data: NodeData,
    /// Containing group, None for root groups
    pub parent: Option<NodeId>,
    /// Ordered items of a group; always empty for conditions
    pub children: Vec<NodeId>,
}

/// Arena-based storage for all condition trees of one editor.
///
/// Uses a generational arena for storage and an id registry for lookups.
/// Parent and child links are registry ids, so detaching a node never leaves
/// an owning back-reference behind.
#[derive(Debug)]
pub struct NodeArena {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Registry of live nodes
    registry: HashMap<NodeId, Index>,
    /// Last id handed out
    last_id: u64,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            registry: HashMap::new(),
            last_id: 0,
        }
    }

    #[instrument(level = "trace", skip(self))]
    fn allocate(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        self.last_id += 1;
        let id = NodeId(self.last_id);
        let idx = self.arena.insert(TreeNode {
            id,
            data,
            parent,
            children: Vec::new(),
        });
        self.registry.insert(id, idx);
        id
    }

    /// Create a parentless group, used as the root of a branch tree.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_root(&mut self, data: GroupData) -> NodeId {
        self.allocate(NodeData::Group(data), None)
    }

    /// Create a condition and append it to `group`.
    pub fn add_condition(&mut self, group: NodeId, data: ConditionData) -> DomainResult<NodeId> {
        self.append_child(group, NodeData::Condition(data))
    }

    /// Create a sub-group and append it to `group`.
    pub fn add_group(&mut self, group: NodeId, data: GroupData) -> DomainResult<NodeId> {
        self.append_child(group, NodeData::Group(data))
    }

    #[instrument(level = "trace", skip(self))]
    fn append_child(&mut self, parent: NodeId, data: NodeData) -> DomainResult<NodeId> {
        self.group(parent)?;
        let id = self.allocate(data, Some(parent));
        if let Some(node) = self.get_mut(parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.registry.get(&id).and_then(|&idx| self.arena.get(idx))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        match self.registry.get(&id) {
            Some(&idx) => self.arena.get_mut(idx),
            None => None,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.registry.contains_key(&id)
    }

    /// Number of live nodes across all trees.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Ordered items of a group; empty for conditions and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Group payload of `id`, or the matching error.
    pub fn group(&self, id: NodeId) -> DomainResult<&GroupData> {
        let node = self.get(id).ok_or(DomainError::NodeNotFound(id))?;
        node.data.as_group().ok_or(DomainError::NotAGroup(id))
    }

    pub(crate) fn group_mut(&mut self, id: NodeId) -> DomainResult<&mut GroupData> {
        let node = self.get_mut(id).ok_or(DomainError::NodeNotFound(id))?;
        node.data.as_group_mut().ok_or(DomainError::NotAGroup(id))
    }

    /// Condition payload of `id`, or the matching error.
    pub fn condition(&self, id: NodeId) -> DomainResult<&ConditionData> {
        let node = self.get(id).ok_or(DomainError::NodeNotFound(id))?;
        node.data.as_condition().ok_or(DomainError::NotACondition(id))
    }

    pub(crate) fn condition_mut(&mut self, id: NodeId) -> DomainResult<&mut ConditionData> {
        let node = self.get_mut(id).ok_or(DomainError::NodeNotFound(id))?;
        node.data
            .as_condition_mut()
            .ok_or(DomainError::NotACondition(id))
    }

    /// Detach `node` from `group` and destroy its subtree.
    ///
    /// Returns `Ok(false)` without touching the tree when `node` is not a direct
    /// item of `group`.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_item(&mut self, group: NodeId, node: NodeId) -> DomainResult<bool> {
        self.group(group)?;
        if !self.children(group).contains(&node) {
            return Ok(false);
        }
        self.remove_subtree(node);
        Ok(true)
    }

    /// Detach `id` from its parent (if any) and deregister it with all descendants.
    ///
    /// Returns the number of nodes removed.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.get_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        let doomed: Vec<NodeId> = self.iter_postorder(id).map(|(nid, _)| nid).collect();
        for nid in &doomed {
            if let Some(idx) = self.registry.remove(nid) {
                self.arena.remove(idx);
            }
        }
        debug!("removed {} node(s) rooted at {}", doomed.len(), id);
        doomed.len()
    }

    /// Re-link `node` under `target` with the complete new item order of `target`.
    ///
    /// Both item lists and the parent link change in this one call. `order`
    /// must contain `node`.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn relink(&mut self, node: NodeId, target: NodeId, order: Vec<NodeId>) {
        if let Some(origin) = self.parent(node) {
            if origin != target {
                if let Some(p) = self.get_mut(origin) {
                    p.children.retain(|&c| c != node);
                }
            }
        }
        if let Some(t) = self.get_mut(target) {
            t.children = order;
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = Some(target);
        }
    }

    /// Walk from the parent of `id` up to its root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: self.parent(id),
        }
    }

    /// True if `ancestor` is `node` itself or lies on the parent chain of `node`.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Topmost group containing `id`.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self, root: NodeId) -> TreeIterator<'_> {
        TreeIterator::new(self, root)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self, root: NodeId) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, root)
    }

    /// Number of nodes in the subtree rooted at `root`.
    pub fn subtree_len(&self, root: NodeId) -> usize {
        self.iter(root).count()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self, root: NodeId) -> usize {
        match self.get(root) {
            Some(node) => {
                1 + node
                    .children
                    .iter()
                    .map(|&child| self.depth(child))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// Recursive validity: conditions must be complete, groups need every item
    /// valid. An empty group is vacuously valid.
    #[instrument(level = "trace", skip(self))]
    pub fn validate_node(&self, id: NodeId) -> bool {
        match self.get(id) {
            Some(node) => match &node.data {
                NodeData::Condition(c) => c.is_complete(),
                NodeData::Group(_) => node.children.iter().all(|&c| self.validate_node(c)),
            },
            None => false,
        }
    }

    /// Nodes of the subtree that fail validation, children before parents.
    ///
    /// A group is listed when any of its items is invalid.
    pub fn invalid_nodes(&self, root: NodeId) -> Vec<NodeId> {
        let mut invalid = Vec::new();
        self.collect_invalid(root, &mut invalid);
        trace!("{} invalid node(s) under {}", invalid.len(), root);
        invalid
    }

    fn collect_invalid(&self, id: NodeId, invalid: &mut Vec<NodeId>) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        let valid = match &node.data {
            NodeData::Condition(c) => c.is_complete(),
            NodeData::Group(_) => {
                let mut all = true;
                for &child in &node.children {
                    all &= self.collect_invalid(child, invalid);
                }
                all
            }
        };
        if !valid {
            invalid.push(id);
        }
        valid
    }
}

pub struct Ancestors<'a> {
    arena: &'a NodeArena,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.arena.parent(current);
        Some(current)
    }
}

pub struct TreeIterator<'a> {
    arena: &'a NodeArena,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a NodeArena, root: NodeId) -> Self {
        let mut stack = Vec::new();
        if arena.contains(root) {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.arena.get(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    arena: &'a NodeArena,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a NodeArena, root: NodeId) -> Self {
        let mut stack = Vec::new();
        if arena.contains(root) {
            stack.push((root, false));
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get(current) {
                if !visited {
                    self.stack.push((current, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current, node));
                }
            }
        }
        None
    }
}
