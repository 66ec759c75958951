//! Change notifications for the presentation layer.

use crate::domain::branch::{BranchId, BranchKind};
use crate::domain::node::NodeId;

/// Committed model change. Emitted after the mutation is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    BranchAdded { branch: BranchId, kind: BranchKind },
    BranchRemoved { branch: BranchId, kind: BranchKind },
    NodeAdded { parent: NodeId, node: NodeId },
    NodeRemoved { parent: NodeId, node: NodeId },
    /// Payload of a node changed (leaf value, logic, negation, tag)
    NodeChanged { node: NodeId },
    NodeMoved {
        node: NodeId,
        from: NodeId,
        to: NodeId,
        index: usize,
    },
    /// Branch got a fresh root group
    RootReset { branch: BranchId, root: NodeId },
    ActionChanged { branch: BranchId },
    /// Nested rule of a branch was added or removed
    NestedChanged { branch: BranchId },
}

/// Subscriber for model changes.
pub trait ChangeObserver {
    fn on_change(&mut self, event: &ModelEvent);
}

impl<F> ChangeObserver for F
where
    F: FnMut(&ModelEvent),
{
    fn on_change(&mut self, event: &ModelEvent) {
        self(event)
    }
}
