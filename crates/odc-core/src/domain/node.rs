//! Remote object model
//!
//! A [`Node`] is the in-memory image of one remote file or folder. Nodes live
//! in the arena owned by [`super::tree::DriveTree`] and refer to each other by
//! [`NodeId`]; the parent link is a plain index and never owns anything.
//!
//! ## Retrieval states
//!
//! ```text
//!   ┌────────────┐  page with cursor  ┌─────────┐  last page  ┌──────────┐
//!   │ NotStarted │ ─────────────────► │ Partial │ ──────────► │ Complete │
//!   └────────────┘                    └─────────┘             └──────────┘
//!         │                                                        ▲
//!         └──────────────────── single page ───────────────────────┘
//! ```
//!
//! Files and folders are tracked separately because a folder-only listing
//! and a full listing are different queries.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::TreeError;
use super::remote_path;
use crate::ports::{RemoteItem, RemoteObject};

// ============================================================================
// NodeId
// ============================================================================

/// Index of a node in its tree's arena
///
/// Ids are never reused within one tree, so a stale id of a removed node
/// fails lookups instead of aliasing a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Creates an id from a raw arena index
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Retrieval bookkeeping
// ============================================================================

/// How much of a folder's children are known locally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalState {
    #[default]
    NotStarted,
    Partial,
    Complete,
}

impl RetrievalState {
    pub fn is_complete(self) -> bool {
        self == RetrievalState::Complete
    }
}

impl fmt::Display for RetrievalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalState::NotStarted => write!(f, "not started"),
            RetrievalState::Partial => write!(f, "partial"),
            RetrievalState::Complete => write!(f, "complete"),
        }
    }
}

/// Continuation link of an unfinished listing, tagged with its query kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub link: String,
    pub only_folders: bool,
}

// ============================================================================
// Folder and file payloads
// ============================================================================

/// Folder-specific state
#[derive(Debug, Clone, Default)]
pub struct FolderNode {
    child_folders: Vec<NodeId>,
    child_files: Vec<NodeId>,
    folders_by_name: HashMap<String, NodeId>,
    files_by_name: HashMap<String, NodeId>,
    pub(crate) child_count: u64,
    pub(crate) next_page: Option<PageCursor>,
    pub(crate) files_state: RetrievalState,
    pub(crate) folders_state: RetrievalState,
}

impl FolderNode {
    pub(crate) fn with_child_count(child_count: u64) -> Self {
        Self {
            child_count,
            ..Self::default()
        }
    }

    /// Remote child count (may exceed what is materialized locally)
    pub fn child_count(&self) -> u64 {
        self.child_count
    }

    /// Continuation of the unfinished listing, if any
    pub fn next_page(&self) -> Option<&PageCursor> {
        self.next_page.as_ref()
    }

    pub fn files_state(&self) -> RetrievalState {
        self.files_state
    }

    pub fn folders_state(&self) -> RetrievalState {
        self.folders_state
    }

    /// Retrieval state relevant to a query kind
    pub fn state_for(&self, only_folders: bool) -> RetrievalState {
        if only_folders {
            self.folders_state
        } else {
            self.files_state
        }
    }

    /// Child folders in discovery order
    pub fn child_folders(&self) -> &[NodeId] {
        &self.child_folders
    }

    /// Child files in discovery order
    pub fn child_files(&self) -> &[NodeId] {
        &self.child_files
    }

    pub fn folder_named(&self, name: &str) -> Option<NodeId> {
        self.folders_by_name.get(name).copied()
    }

    pub fn file_named(&self, name: &str) -> Option<NodeId> {
        self.files_by_name.get(name).copied()
    }

    /// Whether a folder or a file with this name is known
    pub fn has_child_named(&self, name: &str) -> bool {
        self.folders_by_name.contains_key(name) || self.files_by_name.contains_key(name)
    }

    pub(crate) fn insert_child(&mut self, name: &str, id: NodeId, is_folder: bool) {
        let (order, by_name) = if is_folder {
            (&mut self.child_folders, &mut self.folders_by_name)
        } else {
            (&mut self.child_files, &mut self.files_by_name)
        };
        order.push(id);
        by_name.insert(name.to_string(), id);
    }

    pub(crate) fn remove_child(&mut self, name: &str, id: NodeId, is_folder: bool) -> bool {
        let (order, by_name) = if is_folder {
            (&mut self.child_folders, &mut self.folders_by_name)
        } else {
            (&mut self.child_files, &mut self.files_by_name)
        };
        if by_name.get(name) != Some(&id) {
            return false;
        }
        by_name.remove(name);
        order.retain(|child| *child != id);
        true
    }

    /// Record the outcome of one listing page
    ///
    /// A full listing covers both kinds; a folder-only listing never
    /// touches the files state.
    pub(crate) fn record_page(&mut self, only_folders: bool, next_link: Option<String>) {
        let state = if next_link.is_some() {
            RetrievalState::Partial
        } else {
            RetrievalState::Complete
        };
        if !only_folders {
            self.files_state = state;
        }
        if !self.folders_state.is_complete() {
            self.folders_state = state;
        }
        self.next_page = next_link.map(|link| PageCursor { link, only_folders });
    }

    /// Mark a folder whose full content is known (e.g. freshly created)
    pub(crate) fn mark_complete(&mut self) {
        self.files_state = RetrievalState::Complete;
        self.folders_state = RetrievalState::Complete;
        self.next_page = None;
    }
}

/// File-specific state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileNode {
    /// QuickXorHash reported by the server, base64
    pub content_hash: Option<String>,
    /// SHA-1 reported by the server (display only)
    pub sha1_hash: Option<String>,
    /// `false` for remote objects that cannot be fetched as plain files
    pub downloadable: bool,
}

/// Kind-specific part of a node
#[derive(Debug, Clone)]
pub enum NodeKind {
    Folder(FolderNode),
    File(FileNode),
}

// ============================================================================
// Node
// ============================================================================

/// One remote object held in the tree
#[derive(Debug, Clone)]
pub struct Node {
    remote_id: String,
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    /// Last known path of the containing folder; only consulted while the
    /// node is not attached
    pub(crate) parent_path: Option<String>,
    pub(crate) size: u64,
    created_at: Option<DateTime<Utc>>,
    pub(crate) modified_at: Option<DateTime<Utc>>,
    pub(crate) is_root: bool,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Build a detached node from a remote item
    ///
    /// The kind is taken from the item's [`RemoteObject`]; folders start
    /// with nothing retrieved and the server's declared child count.
    pub fn from_remote(item: &RemoteItem) -> Result<Self, TreeError> {
        if item.id.trim().is_empty() {
            return Err(TreeError::InvalidRemoteId(item.id.clone()));
        }
        if !item.is_root && !remote_path::is_valid_name(&item.name) {
            return Err(TreeError::InvalidName(item.name.clone()));
        }

        let kind = match &item.object {
            RemoteObject::Folder { child_count } => {
                NodeKind::Folder(FolderNode::with_child_count(*child_count))
            }
            RemoteObject::File {
                content_hash,
                sha1_hash,
                downloadable,
            } => NodeKind::File(FileNode {
                content_hash: content_hash.clone(),
                sha1_hash: sha1_hash.clone(),
                downloadable: *downloadable,
            }),
        };

        Ok(Self {
            remote_id: item.id.clone(),
            name: item.name.clone(),
            parent: None,
            parent_path: item.parent_path.clone(),
            size: item.size,
            created_at: item.created_at,
            modified_at: item.modified_at,
            is_root: item.is_root,
            kind,
        })
    }

    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Size in bytes; aggregate of all descendant files for folders
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder(_))
    }

    pub fn as_folder(&self) -> Option<&FolderNode> {
        match &self.kind {
            NodeKind::Folder(folder) => Some(folder),
            NodeKind::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match &self.kind {
            NodeKind::File(file) => Some(file),
            NodeKind::Folder(_) => None,
        }
    }

    pub(crate) fn as_folder_mut(&mut self) -> Option<&mut FolderNode> {
        match &mut self.kind {
            NodeKind::Folder(folder) => Some(folder),
            NodeKind::File(_) => None,
        }
    }
}
