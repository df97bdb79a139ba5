//! Drive session
//!
//! [`DriveSession`] is the single owner of one [`DriveTree`]: it pairs the
//! tree with the API it is populated from and a current folder, and exposes
//! the path-based operations the CLI offers.

use std::sync::Arc;

use serde::Serialize;

use super::errors::OperationError;
use super::mutate;
use super::resolve_path::{self, Resolved, Target};
use super::retrieve_children::{retrieve_all, retrieve_children, RetrieveOptions};
use crate::domain::{remote_path, DisplayRecord, DriveTree, IdCache, NodeId, TreeError};
use crate::ports::{DeleteOutcome, DriveApi, ItemRef, RemoteItem, ShareKind};

/// Content of a listed folder
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub target: DisplayRecord,
    pub folders: Vec<DisplayRecord>,
    pub files: Vec<DisplayRecord>,
    /// Whether every child is known (no continuation pending)
    pub complete: bool,
}

/// A tree, its API and a current folder
pub struct DriveSession {
    tree: DriveTree,
    api: Arc<dyn DriveApi>,
    cwd: NodeId,
    page_size: Option<u32>,
}

impl DriveSession {
    /// Fetch the drive root and start a session on it
    pub async fn open(api: Arc<dyn DriveApi>, page_size: Option<u32>) -> Result<Self, OperationError> {
        Self::open_with_cache(api, page_size, IdCache::new()).await
    }

    /// Like [`Self::open`], recording remote ids in a caller-owned cache
    pub async fn open_with_cache(
        api: Arc<dyn DriveApi>,
        page_size: Option<u32>,
        cache: IdCache,
    ) -> Result<Self, OperationError> {
        let root = api.get_item(&ItemRef::Root).await?;
        let tree = DriveTree::with_cache(&root, cache)?;
        let cwd = tree.root();
        Ok(Self {
            tree,
            api,
            cwd,
            page_size,
        })
    }

    pub fn tree(&self) -> &DriveTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DriveTree {
        &mut self.tree
    }

    pub fn api(&self) -> &dyn DriveApi {
        self.api.as_ref()
    }

    pub fn cwd(&self) -> NodeId {
        self.cwd
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Path of the current folder (`/` for the root)
    pub fn cwd_path(&self) -> String {
        let path = self.tree.path(self.cwd);
        if path.is_empty() {
            "/".to_string()
        } else {
            path
        }
    }

    pub fn item_ref(&self, node: NodeId) -> Result<ItemRef, OperationError> {
        Ok(self.tree.item_ref(node)?)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub async fn resolve(&mut self, path: &str) -> Result<Option<Resolved>, OperationError> {
        resolve_path::resolve_path(
            &mut self.tree,
            self.api.as_ref(),
            self.cwd,
            path,
            self.page_size,
        )
        .await
    }

    pub async fn locate(&mut self, path: &str) -> Result<Target, OperationError> {
        resolve_path::locate(
            &mut self.tree,
            self.api.as_ref(),
            self.cwd,
            path,
            self.page_size,
        )
        .await
    }

    /// Resolve a path that must name an existing folder
    pub async fn folder_at(&mut self, path: &str) -> Result<NodeId, OperationError> {
        match self.locate(path).await? {
            Target::Folder(id) => Ok(id),
            Target::File(id) => Err(TreeError::NotAFolder(self.tree.path(id)).into()),
            Target::Missing { .. } => Err(OperationError::PathNotFound(path.to_string())),
        }
    }

    /// Change the current folder
    pub async fn cd(&mut self, path: &str) -> Result<NodeId, OperationError> {
        self.cwd = self.folder_at(path).await?;
        Ok(self.cwd)
    }

    /// Find a direct child of `folder` by name, fetching pages as needed
    pub async fn child(&mut self, folder: NodeId, name: &str) -> Result<Option<NodeId>, OperationError> {
        resolve_path::find_child(&mut self.tree, self.api.as_ref(), folder, name, self.page_size)
            .await
    }

    /// Retrieve one page of `folder` with explicit options
    pub async fn retrieve(&mut self, folder: NodeId, options: RetrieveOptions) -> Result<usize, OperationError> {
        let options = RetrieveOptions {
            max_items: options.max_items.or(self.page_size),
            ..options
        };
        retrieve_children(&mut self.tree, self.api.as_ref(), folder, options).await
    }

    /// Retrieve every child of `folder`
    pub async fn retrieve_all(&mut self, folder: NodeId) -> Result<usize, OperationError> {
        retrieve_all(&mut self.tree, self.api.as_ref(), folder, false, self.page_size).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Display record of any path, the root included
    pub async fn stat(&mut self, path: &str) -> Result<DisplayRecord, OperationError> {
        match self.locate(path).await? {
            Target::Folder(id) | Target::File(id) => Ok(self.tree.describe(id)?),
            Target::Missing { .. } => Err(OperationError::PathNotFound(path.to_string())),
        }
    }

    /// List a folder; `all` follows continuation pages to the end
    pub async fn list(&mut self, path: &str, all: bool) -> Result<Listing, OperationError> {
        let folder = match self.locate(path).await? {
            Target::Folder(id) => id,
            Target::File(id) => {
                return Ok(Listing {
                    target: self.tree.describe(id)?,
                    folders: Vec::new(),
                    files: Vec::new(),
                    complete: true,
                });
            }
            Target::Missing { .. } => return Err(OperationError::PathNotFound(path.to_string())),
        };

        if all {
            self.retrieve_all(folder).await?;
        } else {
            self.retrieve(folder, RetrieveOptions::default()).await?;
        }

        let describe_all = |ids: &[NodeId]| -> Result<Vec<DisplayRecord>, TreeError> {
            ids.iter().map(|id| self.tree.describe(*id)).collect()
        };
        Ok(Listing {
            target: self.tree.describe(folder)?,
            folders: describe_all(self.tree.child_folders(folder))?,
            files: describe_all(self.tree.child_files(folder))?,
            complete: self.tree.folder(folder)?.files_state().is_complete(),
        })
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a folder at `path`; its parent must exist
    pub async fn mkdir(&mut self, path: &str) -> Result<DisplayRecord, OperationError> {
        match self.locate(path).await? {
            Target::Missing { parent, name } => {
                let node =
                    mutate::create_folder(&mut self.tree, self.api.as_ref(), parent, &name).await?;
                Ok(self.tree.describe(node)?)
            }
            Target::Folder(id) | Target::File(id) => {
                Err(TreeError::DestinationExists(self.tree.path(id)).into())
            }
        }
    }

    /// Create `name` inside `parent`, or return the folder already there
    pub async fn ensure_folder(&mut self, parent: NodeId, name: &str) -> Result<NodeId, OperationError> {
        match self.child(parent, name).await? {
            Some(id) if self.tree.node(id)?.is_folder() => Ok(id),
            Some(id) => Err(TreeError::NotAFolder(self.tree.path(id)).into()),
            None => mutate::create_folder(&mut self.tree, self.api.as_ref(), parent, name).await,
        }
    }

    /// Move or rename `source` to `destination`
    ///
    /// An existing destination folder receives the item under its current
    /// name; an existing destination file is refused; a missing destination
    /// is a rename into its parent.
    pub async fn mv(&mut self, source: &str, destination: &str) -> Result<DisplayRecord, OperationError> {
        let node = self
            .locate(source)
            .await?
            .node()
            .ok_or_else(|| OperationError::PathNotFound(source.to_string()))?;

        let (parent, name) = match self.locate(destination).await? {
            Target::Folder(folder) => {
                let name = self.tree.node(node)?.name().to_string();
                if let Some(existing) = self.child(folder, &name).await? {
                    if existing != node {
                        return Err(TreeError::DestinationExists(self.tree.path(existing)).into());
                    }
                }
                (folder, name)
            }
            Target::File(file) => {
                return Err(TreeError::DestinationExists(self.tree.path(file)).into());
            }
            Target::Missing { parent, name } => (parent, name),
        };

        mutate::move_node(&mut self.tree, self.api.as_ref(), node, parent, &name).await?;
        Ok(self.tree.describe(node)?)
    }

    /// Delete `path`; a path that does not resolve reports `NotFound`
    pub async fn rm(&mut self, path: &str) -> Result<DeleteOutcome, OperationError> {
        let target = match self.locate(path).await {
            Ok(target) => target,
            Err(err) if err.is_not_found() => return Ok(DeleteOutcome::NotFound),
            Err(err) => return Err(err),
        };
        match target {
            Target::Folder(id) | Target::File(id) => {
                mutate::delete_node(&mut self.tree, self.api.as_ref(), id).await
            }
            Target::Missing { .. } => Ok(DeleteOutcome::NotFound),
        }
    }

    /// Create an anonymous sharing link for `path`
    pub async fn share(&mut self, path: &str, kind: ShareKind) -> Result<String, OperationError> {
        let node = self
            .locate(path)
            .await?
            .node()
            .ok_or_else(|| OperationError::PathNotFound(path.to_string()))?;
        let item = self.tree.item_ref(node)?;
        Ok(self.api.create_share_link(&item, kind).await?)
    }

    /// Merge the result of an upload into `parent`
    pub fn apply_upload(&mut self, parent: NodeId, item: &RemoteItem) -> Result<NodeId, OperationError> {
        mutate::apply_uploaded_item(&mut self.tree, parent, item)
    }

    /// Split a remote path into an existing parent folder and a base name
    pub async fn parent_and_name(&mut self, path: &str) -> Result<(NodeId, String), OperationError> {
        let absolute = remote_path::join_segments(&remote_path::absolutize(
            &self.tree.path(self.cwd),
            path,
        ));
        let (parent, name) = remote_path::split_parent(&absolute)
            .ok_or(TreeError::RootImmutable("replaced"))?;
        let parent = self
            .folder_at(if parent.is_empty() { "/" } else { &parent })
            .await?;
        Ok((parent, name))
    }
}
