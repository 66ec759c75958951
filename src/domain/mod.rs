//! Domain layer: condition trees, branches and the rule editor
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod branch;
pub mod document;
pub mod drag;
pub mod editor;
pub mod error;
pub mod events;
pub mod node;
pub mod options;
pub mod render;

pub use arena::{NodeArena, TreeNode};
pub use branch::{Action, BranchId, BranchKind, ExpressionBranch};
pub use document::{ActionDoc, BranchDoc, ConditionDoc, EditorDoc, GroupDoc, NodeDoc};
pub use drag::{DragHover, DragSession, DropOutcome, DropRefusal, Placement, Projection};
pub use editor::{RuleEditor, ValidationReport};
pub use error::{DomainError, DomainResult};
pub use events::{ChangeObserver, ModelEvent};
pub use node::{ConditionData, GroupData, Logic, NodeData, NodeId};
pub use options::{EditorOptions, FieldOption};
pub use render::RuleTreeConvert;
