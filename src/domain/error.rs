//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::branch::BranchId;
use crate::domain::node::NodeId;

/// Domain errors report misuse of node or branch handles and unreadable documents.
///
/// Rule violations (sequencing, forbidden drops, incomplete conditions) are not
/// errors: they surface as `false`, `None` or a refused outcome.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("branch not found: {0}")]
    BranchNotFound(BranchId),

    #[error("node is not a group: {0}")]
    NotAGroup(NodeId),

    #[error("node is not a condition: {0}")]
    NotACondition(NodeId),

    #[error("invalid rule document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
