//! Mutations mirrored into the tree
//!
//! Each operation performs the remote call first and only touches the tree
//! once the server accepted the change. Local preconditions that can be
//! checked up front (name conflicts, cycles, the root) are checked before
//! the call so a refused operation mutates neither side.

use tracing::{info, warn};

use super::errors::OperationError;
use crate::domain::{remote_path, DriveTree, NodeId, TreeError};
use crate::ports::{DeleteOutcome, DriveApi, RemoteItem};

/// Create a folder `name` inside `parent`
///
/// The node is built from the server response (the server may rename on
/// conflict), starts empty with nothing left to retrieve, and is attached
/// with size 0.
pub async fn create_folder(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    parent: NodeId,
    name: &str,
) -> Result<NodeId, OperationError> {
    if !remote_path::is_valid_name(name) {
        return Err(TreeError::InvalidName(name.to_string()).into());
    }
    if tree.folder(parent)?.has_child_named(name) {
        return Err(TreeError::DestinationExists(remote_path::child_path(
            &tree.path(parent),
            name,
        ))
        .into());
    }

    let item = api.create_folder(&tree.item_ref(parent)?, name).await?;
    let node = tree.insert_item(&RemoteItem { size: 0, ..item }, None, false)?;
    tree.mark_complete(node)?;
    tree.attach(node, parent)?;
    info!(path = %tree.path(node), "Created folder");
    Ok(node)
}

/// Move `node` into `new_parent` under `new_name`
///
/// Covers plain renames (same parent) as well. An existing child with the
/// target name is reported as [`TreeError::DestinationExists`] before any
/// remote call.
pub async fn move_node(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    node: NodeId,
    new_parent: NodeId,
    new_name: &str,
) -> Result<(), OperationError> {
    if !remote_path::is_valid_name(new_name) {
        return Err(TreeError::InvalidName(new_name.to_string()).into());
    }
    tree.check_relocate(node, new_parent, new_name)?;

    let parent_id = tree.node(new_parent)?.remote_id().to_string();
    let item = api
        .move_item(&tree.item_ref(node)?, &parent_id, new_name)
        .await?;

    let from = tree.path(node);
    tree.relocate(node, new_parent, &item.name)?;
    info!(from = %from, to = %tree.path(node), "Moved item");
    Ok(())
}

/// Delete `node` remotely
///
/// Only a confirmed deletion removes the node (and its subtree) from the
/// tree; "not found" and unexpected statuses leave it in place.
pub async fn delete_node(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    node: NodeId,
) -> Result<DeleteOutcome, OperationError> {
    if tree.node(node)?.is_root() {
        return Err(TreeError::RootImmutable("removed").into());
    }
    let path = tree.path(node);
    let outcome = api.delete_item(&tree.item_ref(node)?).await?;
    match outcome {
        DeleteOutcome::Deleted => {
            tree.remove_subtree(node)?;
            info!(path = %path, "Deleted item");
        }
        DeleteOutcome::NotFound => warn!(path = %path, "Item to delete was not found"),
        DeleteOutcome::Unexpected(status) => {
            warn!(path = %path, status, "Unexpected status while deleting")
        }
    }
    Ok(outcome)
}

/// Merge the item returned by an upload into `parent`
///
/// A same-named file is replaced (detached and dropped first) so the
/// folder aggregates reflect the new size exactly once.
pub fn apply_uploaded_item(
    tree: &mut DriveTree,
    parent: NodeId,
    item: &RemoteItem,
) -> Result<NodeId, OperationError> {
    if let Some(folder) = tree.child_folder(parent, &item.name) {
        return Err(TreeError::DestinationExists(tree.path(folder)).into());
    }
    if let Some(existing) = tree.child_file(parent, &item.name) {
        tree.remove_subtree(existing)?;
    }
    let node = tree.insert_item(item, None, false)?;
    tree.attach(node, parent)?;
    Ok(node)
}
