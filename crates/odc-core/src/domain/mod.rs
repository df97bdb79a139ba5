//! Domain entities and tree logic
//!
//! This module contains the core domain types for ODC:
//! - Nodes (folders and files) and their retrieval bookkeeping
//! - The arena-backed drive tree and its mutation rules
//! - The remote-ID cache
//! - Remote path helpers
//! - Display records
//! - Domain-specific error types

pub mod describe;
pub mod errors;
pub mod id_cache;
pub mod node;
pub mod remote_path;
pub mod tree;

pub use describe::{Describe, DisplayRecord, RecordHeader};
pub use errors::TreeError;
pub use id_cache::IdCache;
pub use node::{FileNode, FolderNode, Node, NodeId, NodeKind, PageCursor, RetrievalState};
pub use tree::{DriveTree, Merge};
