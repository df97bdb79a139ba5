//! Display records
//!
//! The narrow boundary between nodes and whatever renders them: every node
//! variant can turn itself into a flat, serializable [`DisplayRecord`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::TreeError;
use super::node::{FileNode, FolderNode, NodeId, NodeKind};
use super::tree::DriveTree;

/// Fields common to every node kind
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub name: String,
    pub path: String,
    pub id: String,
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Display-ready view of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub kind: &'static str,
    pub name: String,
    pub path: String,
    pub id: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1_hash: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl DisplayRecord {
    pub fn is_folder(&self) -> bool {
        self.kind == "folder"
    }

    fn from_header(kind: &'static str, header: RecordHeader) -> Self {
        Self {
            kind,
            name: header.name,
            path: header.path,
            id: header.id,
            size: header.size,
            child_count: None,
            content_hash: None,
            sha1_hash: None,
            created_at: header.created_at,
            modified_at: header.modified_at,
        }
    }
}

/// Capability of producing a [`DisplayRecord`]
pub trait Describe {
    fn describe(&self, header: RecordHeader) -> DisplayRecord;
}

impl Describe for FolderNode {
    fn describe(&self, header: RecordHeader) -> DisplayRecord {
        DisplayRecord {
            child_count: Some(self.child_count()),
            ..DisplayRecord::from_header("folder", header)
        }
    }
}

impl Describe for FileNode {
    fn describe(&self, header: RecordHeader) -> DisplayRecord {
        let kind = if self.downloadable { "file" } else { "other" };
        DisplayRecord {
            content_hash: self.content_hash.clone(),
            sha1_hash: self.sha1_hash.clone(),
            ..DisplayRecord::from_header(kind, header)
        }
    }
}

impl DriveTree {
    /// Display record of a node
    pub fn describe(&self, id: NodeId) -> Result<DisplayRecord, TreeError> {
        let node = self.node(id)?;
        let path = self.path(id);
        let header = RecordHeader {
            name: if node.is_root() {
                "/".to_string()
            } else {
                node.name().to_string()
            },
            path: if path.is_empty() { "/".to_string() } else { path },
            id: node.remote_id().to_string(),
            size: node.size(),
            created_at: node.created_at(),
            modified_at: node.modified_at(),
        };
        Ok(match node.kind() {
            NodeKind::Folder(folder) => folder.describe(header),
            NodeKind::File(file) => file.describe(header),
        })
    }
}
