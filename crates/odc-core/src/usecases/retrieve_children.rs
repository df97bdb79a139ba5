//! Paginated children retrieval
//!
//! Fetches one listing page per call and merges it into the tree. Pages
//! continue from the folder's stored cursor when it fits the query kind;
//! otherwise a new listing starts. Nodes whose path contains a version-like
//! segment are listed by id (see [`DriveTree::item_ref`]).

use tracing::{debug, instrument};

use super::errors::OperationError;
use crate::domain::{DriveTree, NodeId};
use crate::ports::{DriveApi, ListRequest, ListTarget};

/// Options of a retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveOptions {
    /// List folders only
    pub only_folders: bool,
    /// Descend into newly discovered folders
    pub recursive: bool,
    /// Levels to retrieve; `0` does nothing
    pub depth: u32,
    /// Page size hint (`$top`)
    pub max_items: Option<u32>,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            only_folders: false,
            recursive: false,
            depth: 1,
            max_items: None,
        }
    }
}

impl RetrieveOptions {
    pub fn folders_only() -> Self {
        Self {
            only_folders: true,
            ..Self::default()
        }
    }

    pub fn recursive(depth: u32) -> Self {
        Self {
            recursive: true,
            depth,
            ..Self::default()
        }
    }

    pub fn with_max_items(mut self, max_items: Option<u32>) -> Self {
        self.max_items = max_items;
        self
    }
}

/// Outcome of fetching one page
struct PageOutcome {
    merged: usize,
    new_folders: Vec<NodeId>,
}

/// Fetch and merge one page of `folder`
///
/// Returns `None` when nothing was requested: the relevant state is already
/// complete, or `allow_new` is false and no usable cursor exists.
async fn fetch_page(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    folder: NodeId,
    only_folders: bool,
    max_items: Option<u32>,
    allow_new: bool,
) -> Result<Option<PageOutcome>, OperationError> {
    let state = tree.folder(folder)?;
    if state.state_for(only_folders).is_complete() {
        return Ok(None);
    }

    // A full-listing cursor also yields folders, so it serves both kinds
    let cursor = state
        .next_page()
        .filter(|c| c.only_folders == only_folders || !c.only_folders)
        .cloned();

    let (target, query_folders_only) = match cursor {
        Some(cursor) => (ListTarget::Continuation(cursor.link), cursor.only_folders),
        None if allow_new => (ListTarget::Item(tree.item_ref(folder)?), only_folders),
        None => return Ok(None),
    };

    let request = ListRequest {
        target,
        only_folders: query_folders_only,
        page_size: max_items,
    };
    let page = api.list_children(&request).await?;
    debug!(
        folder = %tree.path(folder),
        items = page.items.len(),
        more = page.next_link.is_some(),
        "Fetched children page"
    );

    let mut outcome = PageOutcome {
        merged: 0,
        new_folders: Vec::new(),
    };
    for item in &page.items {
        if query_folders_only && !item.is_folder() {
            continue;
        }
        let merge = tree.merge_child(folder, item)?;
        if merge.is_new() {
            outcome.merged += 1;
            if item.is_folder() {
                outcome.new_folders.push(merge.id());
            }
        }
    }
    tree.record_page(folder, query_folders_only, page.next_link)?;
    Ok(Some(outcome))
}

/// Retrieve one page of children of `folder`
///
/// No-op when `depth` is 0 or the relevant retrieval state is complete.
/// When `recursive`, every newly discovered folder is retrieved with one
/// level less. Returns the number of nodes added to the tree.
#[instrument(skip(tree, api), fields(folder = %folder))]
pub async fn retrieve_children(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    folder: NodeId,
    options: RetrieveOptions,
) -> Result<usize, OperationError> {
    let mut merged = 0;
    let mut stack = vec![(folder, options.depth)];
    while let Some((current, depth)) = stack.pop() {
        if depth == 0 {
            continue;
        }
        let Some(outcome) = fetch_page(
            tree,
            api,
            current,
            options.only_folders,
            options.max_items,
            true,
        )
        .await?
        else {
            continue;
        };
        merged += outcome.merged;
        if options.recursive {
            stack.extend(outcome.new_folders.into_iter().rev().map(|f| (f, depth - 1)));
        }
    }
    Ok(merged)
}

/// Continue an unfinished listing of `folder` by one page
///
/// No-op when the listing is complete or was never started.
pub async fn retrieve_next_page(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    folder: NodeId,
    options: RetrieveOptions,
) -> Result<usize, OperationError> {
    if options.depth == 0 {
        return Ok(0);
    }
    let Some(outcome) = fetch_page(
        tree,
        api,
        folder,
        options.only_folders,
        options.max_items,
        false,
    )
    .await?
    else {
        return Ok(0);
    };

    let mut merged = outcome.merged;
    if options.recursive && options.depth > 1 {
        for child in outcome.new_folders {
            let child_options = RetrieveOptions {
                depth: options.depth - 1,
                ..options
            };
            merged += retrieve_children(tree, api, child, child_options).await?;
        }
    }
    Ok(merged)
}

/// Page through `folder` until its listing is complete
pub async fn retrieve_all(
    tree: &mut DriveTree,
    api: &dyn DriveApi,
    folder: NodeId,
    only_folders: bool,
    max_items: Option<u32>,
) -> Result<usize, OperationError> {
    let mut merged = 0;
    while let Some(outcome) = fetch_page(tree, api, folder, only_folders, max_items, true).await? {
        merged += outcome.merged;
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RetrievalState;
    use crate::testing::FakeDrive;

    async fn setup(drive: &FakeDrive) -> DriveTree {
        DriveTree::new(&drive.root_item()).unwrap()
    }

    #[tokio::test]
    async fn test_single_page_completes_both_states() {
        let drive = FakeDrive::new();
        drive.add_folder("/A");
        drive.add_file("/x.txt", b"hello", Some("H1"));
        let mut tree = setup(&drive).await;
        let root = tree.root();

        let merged = retrieve_children(&mut tree, &drive, root, RetrieveOptions::default())
            .await
            .unwrap();

        assert_eq!(merged, 2);
        let folder = tree.folder(root).unwrap();
        assert_eq!(folder.files_state(), RetrievalState::Complete);
        assert_eq!(folder.folders_state(), RetrievalState::Complete);
        assert!(folder.next_page().is_none());
    }

    #[tokio::test]
    async fn test_retrieval_is_idempotent() {
        let drive = FakeDrive::new();
        drive.add_file("/A/1.txt", b"1", None);
        drive.add_file("/A/2.txt", b"22", None);
        let mut tree = setup(&drive).await;
        let root = tree.root();
        retrieve_children(&mut tree, &drive, root, RetrieveOptions::default())
            .await
            .unwrap();
        let a = tree.child_folder(root, "A").unwrap();
        retrieve_children(&mut tree, &drive, a, RetrieveOptions::default())
            .await
            .unwrap();
        let before = (
            tree.folder(a).unwrap().child_count(),
            tree.node(a).unwrap().size(),
            tree.child_files(a).to_vec(),
        );
        drive.clear_calls();

        let merged = retrieve_children(&mut tree, &drive, a, RetrieveOptions::default())
            .await
            .unwrap();

        assert_eq!(merged, 0);
        assert!(drive.calls().is_empty());
        let after = (
            tree.folder(a).unwrap().child_count(),
            tree.node(a).unwrap().size(),
            tree.child_files(a).to_vec(),
        );
        assert_eq!(before, after);
        assert_eq!(before.0, 2);
        assert_eq!(before.1, 3);
    }

    #[tokio::test]
    async fn test_pages_continue_from_cursor() {
        let drive = FakeDrive::new().with_page_size(2);
        for name in ["a", "b", "c", "d", "e"] {
            drive.add_file(&format!("/{name}.txt"), b"x", None);
        }
        let mut tree = setup(&drive).await;
        let root = tree.root();

        retrieve_children(&mut tree, &drive, root, RetrieveOptions::default())
            .await
            .unwrap();
        assert_eq!(tree.folder(root).unwrap().files_state(), RetrievalState::Partial);
        assert_eq!(tree.child_files(root).len(), 2);

        retrieve_next_page(&mut tree, &drive, root, RetrieveOptions::default())
            .await
            .unwrap();
        assert_eq!(tree.child_files(root).len(), 4);

        retrieve_next_page(&mut tree, &drive, root, RetrieveOptions::default())
            .await
            .unwrap();
        assert_eq!(tree.child_files(root).len(), 5);
        assert!(tree.folder(root).unwrap().files_state().is_complete());

        drive.clear_calls();
        let merged = retrieve_next_page(&mut tree, &drive, root, RetrieveOptions::default())
            .await
            .unwrap();
        assert_eq!(merged, 0);
        assert!(drive.calls().is_empty());
    }

    #[tokio::test]
    async fn test_next_page_without_cursor_is_noop() {
        let drive = FakeDrive::new();
        drive.add_file("/a.txt", b"x", None);
        let mut tree = setup(&drive).await;
        let root = tree.root();

        let merged = retrieve_next_page(&mut tree, &drive, root, RetrieveOptions::default())
            .await
            .unwrap();

        assert_eq!(merged, 0);
        assert!(drive.calls().is_empty());
        assert_eq!(
            tree.folder(root).unwrap().files_state(),
            RetrievalState::NotStarted
        );
    }

    #[tokio::test]
    async fn test_recursive_depth_bound() {
        let drive = FakeDrive::new();
        drive.add_file("/A/B/C/deep.txt", b"x", None);
        let mut tree = setup(&drive).await;
        let root = tree.root();

        retrieve_children(&mut tree, &drive, root, RetrieveOptions::recursive(2))
            .await
            .unwrap();

        let a = tree.child_folder(root, "A").unwrap();
        let b = tree.child_folder(a, "B").unwrap();
        assert!(tree.folder(a).unwrap().files_state().is_complete());
        assert_eq!(
            tree.folder(b).unwrap().files_state(),
            RetrievalState::NotStarted
        );
        assert!(tree.child_folder(b, "C").is_none());
    }

    #[tokio::test]
    async fn test_zero_depth_is_noop() {
        let drive = FakeDrive::new();
        drive.add_folder("/A");
        let mut tree = setup(&drive).await;
        let root = tree.root();
        let options = RetrieveOptions {
            depth: 0,
            ..RetrieveOptions::default()
        };
        assert_eq!(
            retrieve_children(&mut tree, &drive, root, options).await.unwrap(),
            0
        );
        assert!(drive.calls().is_empty());
    }

    #[tokio::test]
    async fn test_folder_only_then_full_listing() {
        let drive = FakeDrive::new();
        drive.add_folder("/A");
        drive.add_file("/x.txt", b"x", None);
        let mut tree = setup(&drive).await;
        let root = tree.root();

        retrieve_children(&mut tree, &drive, root, RetrieveOptions::folders_only())
            .await
            .unwrap();
        let folder = tree.folder(root).unwrap();
        assert!(folder.folders_state().is_complete());
        assert_eq!(folder.files_state(), RetrievalState::NotStarted);
        assert!(tree.child_files(root).is_empty());

        retrieve_children(&mut tree, &drive, root, RetrieveOptions::default())
            .await
            .unwrap();
        assert_eq!(tree.child_folders(root).len(), 1);
        assert_eq!(tree.child_files(root).len(), 1);
    }

    #[tokio::test]
    async fn test_version_folder_is_listed_by_id() {
        let drive = FakeDrive::new();
        let id = drive.add_folder("/a/v1.0");
        drive.add_folder("/a/v1.0/b");
        let mut tree = setup(&drive).await;
        let root = tree.root();
        retrieve_children(&mut tree, &drive, root, RetrieveOptions::recursive(2))
            .await
            .unwrap();
        let a = tree.child_folder(root, "a").unwrap();
        let v = tree.child_folder(a, "v1.0").unwrap();
        drive.clear_calls();

        retrieve_children(&mut tree, &drive, v, RetrieveOptions::default())
            .await
            .unwrap();

        assert_eq!(drive.calls(), vec![format!("list id:{id}")]);
        assert!(tree.child_folder(v, "b").is_some());
    }

    #[tokio::test]
    async fn test_retrieve_all_follows_every_page() {
        let drive = FakeDrive::new().with_page_size(1);
        for name in ["a", "b", "c"] {
            drive.add_folder(&format!("/{name}"));
        }
        let mut tree = setup(&drive).await;
        let root = tree.root();

        let merged = retrieve_all(&mut tree, &drive, root, false, None)
            .await
            .unwrap();

        assert_eq!(merged, 3);
        assert!(tree.folder(root).unwrap().files_state().is_complete());
    }
}
