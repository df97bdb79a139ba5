//! Domain error types
//!
//! Errors raised by the in-memory tree when an operation would break one of
//! its structural invariants.

use thiserror::Error;

use super::node::NodeId;

/// Errors that can occur while manipulating the object tree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The node id does not refer to a live node of this tree
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// The node was expected to be a folder
    #[error("Not a folder: {0}")]
    NotAFolder(String),

    /// The node was expected to be a file
    #[error("Not a file: {0}")]
    NotAFile(String),

    /// A child with the same name already exists in the target folder
    #[error("Destination exists: {0}")]
    DestinationExists(String),

    /// The node is already attached to a parent
    #[error("Node is already attached: {0}")]
    AlreadyAttached(String),

    /// The node has no parent to detach from
    #[error("Node is not attached: {0}")]
    NotAttached(String),

    /// The drive root cannot be moved, renamed or removed
    #[error("The root folder cannot be {0}")]
    RootImmutable(&'static str),

    /// Attaching the node would make it its own ancestor
    #[error("Cannot move a folder inside itself: {0}")]
    Cycle(String),

    /// Remote identifiers must not be empty
    #[error("Invalid remote ID: {0:?}")]
    InvalidRemoteId(String),

    /// Names must be non-empty and must not contain a path separator
    #[error("Invalid name: {0:?}")]
    InvalidName(String),
}
