//! Lazy path resolution
//!
//! Walks a textual path from the root one segment at a time. A folder's
//! children are fetched only when the segment being looked up is not known
//! yet, so resolution costs network calls only along the traversed branch.

use tracing::debug;

use super::errors::OperationError;
use super::retrieve_children::{retrieve_children, RetrieveOptions};
use crate::domain::{remote_path, DriveTree, NodeId};
use crate::ports::DriveApi;

/// Result of walking a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Deepest folder reached
    pub folder: NodeId,
    /// Last segment when it did not name a folder
    pub remainder: Option<String>,
}

/// What a path designates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Folder(NodeId),
    File(NodeId),
    /// Nothing exists yet under `name` inside `parent`
    Missing { parent: NodeId, name: String },
}

impl Target {
    /// The existing node, if any
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Target::Folder(id) | Target::File(id) => Some(*id),
            Target::Missing { .. } => None,
        }
    }
}

/// Find a child folder, fetching folder pages until found or exhausted
pub async fn find_child_folder(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    folder: NodeId,
    name: &str,
    max_items: Option<u32>,
) -> Result<Option<NodeId>, OperationError> {
    let options = RetrieveOptions::folders_only().with_max_items(max_items);
    loop {
        if let Some(found) = tree.child_folder(folder, name) {
            return Ok(Some(found));
        }
        if tree.folder(folder)?.folders_state().is_complete() {
            return Ok(None);
        }
        retrieve_children(tree, api, folder, options).await?;
    }
}

/// Find a child of either kind, fetching full pages until found or exhausted
pub async fn find_child(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    folder: NodeId,
    name: &str,
    max_items: Option<u32>,
) -> Result<Option<NodeId>, OperationError> {
    let options = RetrieveOptions::default().with_max_items(max_items);
    loop {
        if let Some(found) = tree.child(folder, name) {
            return Ok(Some(found));
        }
        if tree.folder(folder)?.files_state().is_complete() {
            return Ok(None);
        }
        retrieve_children(tree, api, folder, options).await?;
    }
}

/// Resolve `text` against the folder `current`
///
/// Absolute paths start at the root; relative ones at `current`. `.` and
/// `..` are normalized textually first. Returns `None` when an intermediate
/// segment does not exist; a missing last segment is returned as the
/// remainder.
pub async fn resolve_path(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    current: NodeId,
    text: &str,
    max_items: Option<u32>,
) -> Result<Option<Resolved>, OperationError> {
    let segments = remote_path::absolutize(&tree.path(current), text);
    let mut folder = tree.root();

    for (index, segment) in segments.iter().enumerate() {
        match find_child_folder(tree, api, folder, segment, max_items).await? {
            Some(child) => folder = child,
            None if index + 1 == segments.len() => {
                return Ok(Some(Resolved {
                    folder,
                    remainder: Some(segment.clone()),
                }));
            }
            None => {
                debug!(path = text, segment = %segment, "Path segment not found");
                return Ok(None);
            }
        }
    }

    Ok(Some(Resolved {
        folder,
        remainder: None,
    }))
}

/// Classify `text` as an existing folder, an existing file, or a new name
pub async fn locate(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    current: NodeId,
    text: &str,
    max_items: Option<u32>,
) -> Result<Target, OperationError> {
    let Some(resolved) = resolve_path(tree, api, current, text, max_items).await? else {
        return Err(OperationError::PathNotFound(text.to_string()));
    };
    let Some(name) = resolved.remainder else {
        return Ok(Target::Folder(resolved.folder));
    };
    match find_child(tree, api, resolved.folder, &name, max_items).await? {
        Some(id) if tree.node(id)?.is_folder() => Ok(Target::Folder(id)),
        Some(id) => Ok(Target::File(id)),
        None => Ok(Target::Missing {
            parent: resolved.folder,
            name,
        }),
    }
}
