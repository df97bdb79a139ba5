//! Arena-backed object tree
//!
//! [`DriveTree`] owns every [`Node`] of one drive. Parent and child links are
//! [`NodeId`] indices into the arena, so dropping the tree drops everything.
//!
//! Two ways of adding nodes exist and they differ in bookkeeping:
//!
//! - **Merging** ([`DriveTree::merge_child`]) registers a node reported by a
//!   listing. The server's sizes and child counts already account for it, so
//!   no aggregate changes.
//! - **Attaching** ([`DriveTree::attach`]) mirrors a local mutation (create,
//!   move, upload). The parent's child count grows by one and the node's size
//!   is added to every ancestor up to the root.
//!
//! [`DriveTree::detach`] is the exact inverse of `attach`; moves and renames
//! are a detach followed by an attach so aggregates are never counted twice.

use chrono::Utc;
use tracing::{debug, warn};

use super::errors::TreeError;
use super::id_cache::IdCache;
use super::node::{FileNode, FolderNode, Node, NodeId, NodeKind};
use super::remote_path;
use crate::ports::{ItemRef, RemoteItem};

/// Result of merging a listed item into a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// A new node was registered
    Inserted(NodeId),
    /// A child with that name was already known; nothing changed
    Known(NodeId),
}

impl Merge {
    pub fn id(self) -> NodeId {
        match self {
            Merge::Inserted(id) | Merge::Known(id) => id,
        }
    }

    pub fn is_new(self) -> bool {
        matches!(self, Merge::Inserted(_))
    }
}

/// In-memory image of a remote drive
#[derive(Debug)]
pub struct DriveTree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    cache: IdCache,
}

impl DriveTree {
    /// Create a tree holding only the drive root
    pub fn new(root: &RemoteItem) -> Result<Self, TreeError> {
        Self::with_cache(root, IdCache::new())
    }

    /// Create a tree that records remote ids in `cache`
    ///
    /// The cache is cleared first: its entries index this tree's arena only.
    pub fn with_cache(root: &RemoteItem, cache: IdCache) -> Result<Self, TreeError> {
        let mut node = Node::from_remote(root)?;
        if !node.is_folder() {
            return Err(TreeError::NotAFolder(root.name.clone()));
        }
        node.is_root = true;
        node.parent_path = None;

        cache.clear();
        let root_id = NodeId::from_index(0);
        cache.insert(node.remote_id(), root_id);

        Ok(Self {
            nodes: vec![Some(node)],
            root: root_id,
            cache,
        })
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn cache(&self) -> &IdCache {
        &self.cache
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub fn folder(&self, id: NodeId) -> Result<&FolderNode, TreeError> {
        self.node(id)?
            .as_folder()
            .ok_or_else(|| TreeError::NotAFolder(self.path(id)))
    }

    fn folder_mut(&mut self, id: NodeId) -> Result<&mut FolderNode, TreeError> {
        if !self.node(id)?.is_folder() {
            return Err(TreeError::NotAFolder(self.path(id)));
        }
        self.node_mut(id)?
            .as_folder_mut()
            .ok_or(TreeError::UnknownNode(id))
    }

    pub fn file(&self, id: NodeId) -> Result<&FileNode, TreeError> {
        self.node(id)?
            .as_file()
            .ok_or_else(|| TreeError::NotAFile(self.path(id)))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(Node::parent)
    }

    /// Absolute remote path of a node (`""` for the root)
    ///
    /// Detached nodes fall back to the last parent path they were known
    /// under.
    pub fn path(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = Vec::new();
        let mut current = id;
        loop {
            let Ok(node) = self.node(current) else {
                break;
            };
            if node.is_root {
                break;
            }
            names.push(&node.name);
            match node.parent {
                Some(parent) => current = parent,
                None => {
                    names.reverse();
                    let prefix = node.parent_path.as_deref().unwrap_or_default();
                    return format!("{prefix}{}", remote_path::join_segments(&names));
                }
            }
        }
        names.reverse();
        remote_path::join_segments(&names)
    }

    /// Ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent(parent);
        }
        chain
    }

    /// Whether `candidate` is `id` itself or one of its ancestors
    pub fn is_ancestor_or_self(&self, candidate: NodeId, id: NodeId) -> bool {
        candidate == id || self.ancestors(id).contains(&candidate)
    }

    /// Look up a child folder by name
    ///
    /// `.` names the folder itself and `..` its parent (the root is its own
    /// parent). Neither is ever stored in the child collections.
    pub fn child_folder(&self, folder: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(folder).ok()?;
        let folder_node = node.as_folder()?;
        match name {
            "." => Some(folder),
            ".." => node.parent.or(node.is_root.then_some(folder)),
            _ => folder_node.folder_named(name),
        }
    }

    pub fn child_file(&self, folder: NodeId, name: &str) -> Option<NodeId> {
        self.folder(folder).ok()?.file_named(name)
    }

    /// Look up a child of either kind, folders first
    pub fn child(&self, folder: NodeId, name: &str) -> Option<NodeId> {
        self.child_folder(folder, name)
            .or_else(|| self.child_file(folder, name))
    }

    pub fn child_folders(&self, folder: NodeId) -> &[NodeId] {
        self.folder(folder)
            .map(FolderNode::child_folders)
            .unwrap_or(&[])
    }

    pub fn child_files(&self, folder: NodeId) -> &[NodeId] {
        self.folder(folder)
            .map(FolderNode::child_files)
            .unwrap_or(&[])
    }

    /// Find a live node by its server identifier
    pub fn find_by_remote_id(&self, remote_id: &str) -> Option<NodeId> {
        if let Some(id) = self.cache.get(remote_id) {
            match self.node(id) {
                Ok(node) if node.remote_id() == remote_id => return Some(id),
                _ => {
                    self.cache.evict(remote_id);
                }
            }
        }

        let found = self
            .nodes
            .iter()
            .enumerate()
            .find(|(_, slot)| {
                slot.as_ref()
                    .is_some_and(|node| node.remote_id() == remote_id)
            })
            .map(|(index, _)| NodeId::from_index(index))?;
        self.cache.insert(remote_id, found);
        Some(found)
    }

    /// How requests should address a node
    ///
    /// Paths containing a version-like segment (`v1.0`) are misrouted by the
    /// server, so those nodes are addressed by id.
    pub fn item_ref(&self, id: NodeId) -> Result<ItemRef, TreeError> {
        let node = self.node(id)?;
        if node.is_root {
            return Ok(ItemRef::Root);
        }
        let path = self.path(id);
        if remote_path::has_version_segment(&path) {
            Ok(ItemRef::Id(node.remote_id().to_string()))
        } else {
            Ok(ItemRef::Path(path))
        }
    }

    // ========================================================================
    // Building from responses
    // ========================================================================

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.cache.insert(node.remote_id(), id);
        self.nodes.push(Some(node));
        id
    }

    /// Turn a server item into a node
    ///
    /// With a parent the item is merged into it (see [`Self::merge_child`]).
    /// Without one the node is created detached; that is usually a caller
    /// mistake, so it is logged unless `warn_orphan` is false.
    pub fn insert_item(
        &mut self,
        item: &RemoteItem,
        parent: Option<NodeId>,
        warn_orphan: bool,
    ) -> Result<NodeId, TreeError> {
        match parent {
            Some(parent) => self.merge_child(parent, item).map(Merge::id),
            None => {
                let node = Node::from_remote(item)?;
                if warn_orphan {
                    warn!(
                        name = %item.name,
                        remote_id = %item.id,
                        "Created a node without a parent; it is not linked into the tree"
                    );
                }
                Ok(self.allocate(node))
            }
        }
    }

    /// Register a listed child unless one with the same name is known
    ///
    /// Aggregates are left alone: the server already counts the child.
    pub fn merge_child(&mut self, parent: NodeId, item: &RemoteItem) -> Result<Merge, TreeError> {
        let folder = self.folder(parent)?;
        if let Some(existing) = folder
            .folder_named(&item.name)
            .or_else(|| folder.file_named(&item.name))
        {
            debug!(name = %item.name, "Child already known, skipping merge");
            return Ok(Merge::Known(existing));
        }
        if item.is_root {
            return Err(TreeError::RootImmutable("attached"));
        }

        let parent_path = self.path(parent);
        let mut node = Node::from_remote(item)?;
        node.parent = Some(parent);
        node.parent_path = Some(parent_path);

        let name = node.name.clone();
        let is_folder = node.is_folder();
        let id = self.allocate(node);
        self.folder_mut(parent)?.insert_child(&name, id, is_folder);
        Ok(Merge::Inserted(id))
    }

    /// Record the outcome of a listing page for `folder`
    pub fn record_page(
        &mut self,
        folder: NodeId,
        only_folders: bool,
        next_link: Option<String>,
    ) -> Result<(), TreeError> {
        self.folder_mut(folder)?.record_page(only_folders, next_link);
        Ok(())
    }

    /// Mark every child of `folder` as known
    pub fn mark_complete(&mut self, folder: NodeId) -> Result<(), TreeError> {
        self.folder_mut(folder)?.mark_complete();
        Ok(())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Check that `node` could be linked under `parent` as `name`
    pub fn check_relocate(&self, node: NodeId, parent: NodeId, name: &str) -> Result<(), TreeError> {
        if self.node(node)?.is_root {
            return Err(TreeError::RootImmutable("moved"));
        }
        let folder = self.folder(parent)?;
        if let Some(existing) = folder
            .folder_named(name)
            .or_else(|| folder.file_named(name))
        {
            if existing != node {
                return Err(TreeError::DestinationExists(remote_path::child_path(
                    &self.path(parent),
                    name,
                )));
            }
        }
        if self.is_ancestor_or_self(node, parent) {
            return Err(TreeError::Cycle(self.path(node)));
        }
        Ok(())
    }

    fn bump_ancestors(&mut self, start: NodeId, size: u64, grow: bool) {
        let now = Utc::now();
        let mut current = Some(start);
        while let Some(id) = current {
            let Ok(node) = self.node_mut(id) else {
                break;
            };
            node.size = if grow {
                node.size.saturating_add(size)
            } else {
                node.size.saturating_sub(size)
            };
            node.modified_at = Some(now);
            current = node.parent;
        }
    }

    /// Link a detached node under `parent`
    ///
    /// Increments the parent's child count, and adds the node's size to the
    /// parent and every ancestor above it.
    pub fn attach(&mut self, node: NodeId, parent: NodeId) -> Result<(), TreeError> {
        let (name, is_folder, size, attached) = {
            let n = self.node(node)?;
            (n.name.clone(), n.is_folder(), n.size, n.parent.is_some())
        };
        if attached {
            return Err(TreeError::AlreadyAttached(self.path(node)));
        }
        self.check_relocate(node, parent, &name)?;

        let parent_path = self.path(parent);
        let folder = self.folder_mut(parent)?;
        folder.insert_child(&name, node, is_folder);
        folder.child_count += 1;
        self.bump_ancestors(parent, size, true);

        let n = self.node_mut(node)?;
        n.parent = Some(parent);
        n.parent_path = Some(parent_path);
        Ok(())
    }

    /// Unlink a node from its parent, undoing [`Self::attach`]
    pub fn detach(&mut self, node: NodeId) -> Result<(), TreeError> {
        let (name, is_folder, size, parent) = {
            let n = self.node(node)?;
            if n.is_root {
                return Err(TreeError::RootImmutable("detached"));
            }
            (n.name.clone(), n.is_folder(), n.size, n.parent)
        };
        let Some(parent) = parent else {
            return Err(TreeError::NotAttached(self.path(node)));
        };

        let parent_path = self.path(parent);
        let folder = self.folder_mut(parent)?;
        folder.remove_child(&name, node, is_folder);
        folder.child_count = folder.child_count.saturating_sub(1);
        self.bump_ancestors(parent, size, false);

        let n = self.node_mut(node)?;
        n.parent = None;
        n.parent_path = Some(parent_path);
        Ok(())
    }

    /// Move and/or rename an attached node
    ///
    /// Every precondition is checked before anything changes, so a failure
    /// leaves the tree untouched.
    pub fn relocate(
        &mut self,
        node: NodeId,
        new_parent: NodeId,
        new_name: &str,
    ) -> Result<(), TreeError> {
        if !remote_path::is_valid_name(new_name) {
            return Err(TreeError::InvalidName(new_name.to_string()));
        }
        self.check_relocate(node, new_parent, new_name)?;
        if self.node(node)?.parent.is_none() {
            return Err(TreeError::NotAttached(self.path(node)));
        }

        self.detach(node)?;
        self.node_mut(node)?.name = new_name.to_string();
        self.attach(node, new_parent)
    }

    /// Detach a node and drop it together with all its descendants
    ///
    /// Returns the number of nodes removed.
    pub fn remove_subtree(&mut self, node: NodeId) -> Result<usize, TreeError> {
        let n = self.node(node)?;
        if n.is_root {
            return Err(TreeError::RootImmutable("removed"));
        }
        if n.parent.is_some() {
            self.detach(node)?;
        }

        let mut removed = 0;
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(dropped) = self.nodes.get_mut(id.index()).and_then(Option::take) else {
                continue;
            };
            if let NodeKind::Folder(folder) = &dropped.kind {
                stack.extend_from_slice(folder.child_folders());
                stack.extend_from_slice(folder.child_files());
            }
            if self.cache.get(dropped.remote_id()) == Some(id) {
                self.cache.evict(dropped.remote_id());
            }
            removed += 1;
        }
        debug!(removed, "Removed subtree from tree");
        Ok(removed)
    }
}
