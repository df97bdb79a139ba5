//! Drive API port (driven/secondary port)
//!
//! This module defines the interface the core uses to talk to the remote
//! drive. The Graph adapter implements it over HTTP; tests implement it in
//! memory.
//!
//! ## Design Notes
//!
//! - [`RemoteItem`] is a port-level DTO already normalized by the adapter
//!   (timestamps in UTC, parent path unescaped). The tree turns it into nodes.
//! - [`RemoteObject`] is decided once, at parse time, from the presence of
//!   the `folder` facet.
//! - Errors carry the request target so callers can tell "not found" apart
//!   from other failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Remote items
// ============================================================================

/// Kind-specific part of a remote item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteObject {
    /// A folder; `child_count` is the count declared by the server
    Folder { child_count: u64 },
    /// Anything that is not a folder
    File {
        /// QuickXorHash (base64), when the server computed one
        content_hash: Option<String>,
        /// SHA-1 hash, informational only
        sha1_hash: Option<String>,
        /// `false` for items without a `file` facet (packages, notebooks)
        downloadable: bool,
    },
}

/// A single item returned by the remote drive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Server-assigned identifier
    pub id: String,
    /// Base name
    pub name: String,
    /// Size in bytes (aggregate of descendants for folders)
    pub size: u64,
    /// Normalized path of the containing folder (`""` for children of the
    /// root, `None` when the server did not report one)
    pub parent_path: Option<String>,
    /// Identifier of the containing folder
    pub parent_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Whether this item is the drive root
    pub is_root: bool,
    pub object: RemoteObject,
}

impl RemoteItem {
    /// Whether the item is a folder
    pub fn is_folder(&self) -> bool {
        matches!(self.object, RemoteObject::Folder { .. })
    }
}

/// One page of a children listing
#[derive(Debug, Clone, Default)]
pub struct ChildrenPage {
    pub items: Vec<RemoteItem>,
    /// Continuation link for the next page (`None` on the last page)
    pub next_link: Option<String>,
}

// ============================================================================
// Request addressing
// ============================================================================

/// How an existing item is addressed in a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemRef {
    /// The drive root
    Root,
    /// Path-based addressing (`/Documents/report.pdf`)
    Path(String),
    /// Id-based addressing
    Id(String),
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemRef::Root => write!(f, "root"),
            ItemRef::Path(path) => write!(f, "path:{path}"),
            ItemRef::Id(id) => write!(f, "id:{id}"),
        }
    }
}

/// Target of a children listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListTarget {
    /// First page of the children of an item
    Item(ItemRef),
    /// Follow-up page from a continuation link
    Continuation(String),
}

/// A children listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub target: ListTarget,
    /// Restrict the listing to folders
    pub only_folders: bool,
    /// Maximum number of items per page
    pub page_size: Option<u32>,
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeleteOutcome {
    /// The item was deleted (HTTP 204)
    Deleted,
    /// The item did not exist (HTTP 404)
    NotFound,
    /// Any other status code
    Unexpected(u16),
}

/// Kind of sharing link to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKind {
    View,
    Edit,
}

impl ShareKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareKind::View => "view",
            ShareKind::Edit => "edit",
        }
    }
}

/// Information about the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub display_name: String,
    pub principal_name: String,
    pub id: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by [`DriveApi`] implementations
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with an error body for `target`
    #[error("Request for {target} failed with status {status} ({code}): {message}")]
    Remote {
        /// The request target (path or id) that failed
        target: String,
        status: u16,
        /// Error code from the response body (e.g. `itemNotFound`)
        code: String,
        message: String,
    },

    /// The access token was rejected; never retried here
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The response could not be interpreted
    #[error("Invalid response for {target}: {reason}")]
    InvalidResponse { target: String, reason: String },

    /// Transport-level failure
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl ApiError {
    /// Whether the error means the addressed item does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Remote { status: 404, .. })
            || matches!(self, ApiError::Remote { code, .. } if code == "itemNotFound")
    }

    /// The request target, when known
    pub fn target(&self) -> Option<&str> {
        match self {
            ApiError::Remote { target, .. } | ApiError::InvalidResponse { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }
}

// ============================================================================
// DriveApi trait
// ============================================================================

/// Port trait for remote drive metadata operations
///
/// Implementations perform exactly one logical request per call and do not
/// retry authentication failures.
#[async_trait::async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetch one page of children
    async fn list_children(&self, request: &ListRequest) -> Result<ChildrenPage, ApiError>;

    /// Fetch the metadata of one item
    async fn get_item(&self, item: &ItemRef) -> Result<RemoteItem, ApiError>;

    /// Create a folder named `name` inside `parent`
    ///
    /// The server may pick a different name on conflict; the returned item
    /// carries the final one.
    async fn create_folder(&self, parent: &ItemRef, name: &str) -> Result<RemoteItem, ApiError>;

    /// Move and/or rename `item` into the folder with id `new_parent_id`
    async fn move_item(
        &self,
        item: &ItemRef,
        new_parent_id: &str,
        new_name: &str,
    ) -> Result<RemoteItem, ApiError>;

    /// Delete an item
    async fn delete_item(&self, item: &ItemRef) -> Result<DeleteOutcome, ApiError>;

    /// Create an anonymous sharing link and return its web URL
    async fn create_share_link(&self, item: &ItemRef, kind: ShareKind) -> Result<String, ApiError>;

    /// Retrieve the signed-in user
    async fn user_info(&self) -> Result<UserInfo, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_error(status: u16, code: &str) -> ApiError {
        ApiError::Remote {
            target: "/Documents".to_string(),
            status,
            code: code.to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_not_found_detection() {
        assert!(remote_error(404, "itemNotFound").is_not_found());
        assert!(remote_error(400, "itemNotFound").is_not_found());
        assert!(!remote_error(400, "invalidRequest").is_not_found());
        assert!(!ApiError::Unauthorized("expired".into()).is_not_found());
    }

    #[test]
    fn test_error_target() {
        assert_eq!(remote_error(500, "x").target(), Some("/Documents"));
        assert_eq!(ApiError::Unauthorized("x".into()).target(), None);
    }

    #[test]
    fn test_item_ref_display() {
        assert_eq!(ItemRef::Root.to_string(), "root");
        assert_eq!(ItemRef::Path("/a".into()).to_string(), "path:/a");
        assert_eq!(ItemRef::Id("42".into()).to_string(), "id:42");
    }
}
