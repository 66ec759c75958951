//! Drag-based reparenting of condition nodes.
//!
//! A session starts with [`RuleEditor::start_drag`], receives any number of
//! [`RuleEditor::drag_over`] projections and ends by value in either
//! [`RuleEditor::drop_on`] or [`RuleEditor::cancel_drag`]. Projections never
//! touch the tree; only the drop commits. A group can never be dropped into
//! itself or one of its descendants.

use tracing::{debug, instrument, warn};

use crate::domain::editor::RuleEditor;
use crate::domain::events::ModelEvent;
use crate::domain::node::NodeId;

/// Half of a hovered item the pointer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

impl Placement {
    /// Upper half of `[start, start + extent)` is `Before`, the rest `After`.
    pub fn from_pointer(pointer: f64, start: f64, extent: f64) -> Self {
        if pointer < start + extent / 2.0 {
            Placement::Before
        } else {
            Placement::After
        }
    }
}

/// What the pointer is over inside the target group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragHover {
    /// Over a direct item of the target
    Item { item: NodeId, placement: Placement },
    /// Over empty space of the target
    Empty,
}

/// Projected item order of one target group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub target: NodeId,
    pub order: Vec<NodeId>,
}

/// One drag session. Consumed by drop or cancel.
#[derive(Debug)]
pub struct DragSession {
    node: NodeId,
    origin: NodeId,
    serial: u64,
    projection: Option<Projection>,
}

impl DragSession {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Group the node was in when the session started.
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRefusal {
    /// Session was cancelled, superseded, or its node is gone
    StaleSession,
    TargetNotFound,
    TargetNotAGroup,
    IntoSelfOrDescendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Moved {
        node: NodeId,
        from: NodeId,
        to: NodeId,
        index: usize,
    },
    Refused(DropRefusal),
}

impl DropOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, DropOutcome::Moved { .. })
    }
}

impl RuleEditor {
    /// Node of the active drag session, if any.
    pub fn dragging(&self) -> Option<NodeId> {
        self.dragging
    }

    /// Begin dragging `node`. Root groups and unknown nodes cannot be dragged.
    ///
    /// A still-active earlier session is superseded.
    #[instrument(level = "debug", skip(self))]
    pub fn start_drag(&mut self, node: NodeId) -> Option<DragSession> {
        let origin = self.nodes.parent(node)?;
        if let Some(stale) = self.dragging {
            warn!("superseding unfinished drag of {}", stale);
        }
        self.drag_serial += 1;
        self.dragging = Some(node);
        Some(DragSession {
            node,
            origin,
            serial: self.drag_serial,
            projection: None,
        })
    }

    fn is_current(&self, session: &DragSession) -> bool {
        self.dragging == Some(session.node)
            && self.drag_serial == session.serial
            && self.nodes.contains(session.node)
    }

    fn check_target(&self, node: NodeId, target: NodeId) -> Result<(), DropRefusal> {
        let Some(t) = self.nodes.get(target) else {
            return Err(DropRefusal::TargetNotFound);
        };
        if !t.data.is_group() {
            return Err(DropRefusal::TargetNotAGroup);
        }
        if self.nodes.is_ancestor_or_self(node, target) {
            return Err(DropRefusal::IntoSelfOrDescendant);
        }
        Ok(())
    }

    /// Project the dragged node into `target` without mutating the tree.
    ///
    /// Returns `false` when the target cannot accept the node or the hovered
    /// item is not a direct item of the target; the previous projection stays.
    #[instrument(level = "trace", skip(self, session))]
    pub fn drag_over(
        &self,
        session: &mut DragSession,
        target: NodeId,
        hover: DragHover,
    ) -> bool {
        if !self.is_current(session) || self.check_target(session.node, target).is_err() {
            return false;
        }
        let mut order = match &session.projection {
            Some(p) if p.target == target => p.order.clone(),
            _ => self.nodes.children(target).to_vec(),
        };

        match hover {
            DragHover::Item { item, placement } => {
                if item == session.node || !order.contains(&item) {
                    return false;
                }
                order.retain(|&id| id != session.node);
                let anchor = order.iter().position(|&id| id == item).unwrap_or(order.len());
                let at = match placement {
                    Placement::Before => anchor,
                    Placement::After => anchor + 1,
                };
                order.insert(at.min(order.len()), session.node);
            }
            DragHover::Empty => {
                order.retain(|&id| id != session.node);
                order.push(session.node);
            }
        }

        session.projection = Some(Projection { target, order });
        true
    }

    /// Commit the session into `target` and end it.
    ///
    /// The final item order of `target` is the projected one when the last
    /// projection was over `target`; otherwise the node keeps its place if it
    /// already is an item of `target` or is appended.
    #[instrument(level = "debug", skip(self, session), fields(node = %session.node))]
    pub fn drop_on(&mut self, session: DragSession, target: NodeId) -> DropOutcome {
        let outcome = self.commit_drop(&session, target);
        if self.drag_serial == session.serial {
            self.dragging = None;
        }
        match &outcome {
            DropOutcome::Moved {
                node,
                from,
                to,
                index,
            } => self.emit(ModelEvent::NodeMoved {
                node: *node,
                from: *from,
                to: *to,
                index: *index,
            }),
            DropOutcome::Refused(reason) => debug!("drop refused: {:?}", reason),
        }
        outcome
    }

    /// End the session without committing, e.g. a drop outside any group.
    pub fn cancel_drag(&mut self, session: DragSession) {
        if self.drag_serial == session.serial {
            self.dragging = None;
        }
        debug!("drag of {} cancelled", session.node);
    }

    fn commit_drop(&mut self, session: &DragSession, target: NodeId) -> DropOutcome {
        if !self.is_current(session) {
            return DropOutcome::Refused(DropRefusal::StaleSession);
        }
        let node = session.node;
        if let Err(reason) = self.check_target(node, target) {
            return DropOutcome::Refused(reason);
        }
        let Some(from) = self.nodes.parent(node) else {
            return DropOutcome::Refused(DropRefusal::StaleSession);
        };

        let current = self.nodes.children(target);
        let order: Vec<NodeId> = match &session.projection {
            Some(p) if p.target == target => {
                // items added or removed since the projection keep the tree authoritative
                let mut order: Vec<NodeId> = p
                    .order
                    .iter()
                    .copied()
                    .filter(|&id| id == node || current.contains(&id))
                    .collect();
                order.extend(current.iter().copied().filter(|id| !p.order.contains(id)));
                order
            }
            _ if from == target => current.to_vec(),
            _ => {
                let mut order = current.to_vec();
                order.push(node);
                order
            }
        };
        let index = order.iter().position(|&id| id == node).unwrap_or(0);

        self.nodes.relink(node, target, order);
        DropOutcome::Moved {
            node,
            from,
            to: target,
            index,
        }
    }
}
