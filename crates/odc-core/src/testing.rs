//! In-memory drive for tests
//!
//! [`FakeDrive`] implements [`DriveApi`] and [`ContentTransfer`] over a map
//! of paths. It pages listings like the real service, records every call,
//! and reproduces the version-segment routing defect: path-addressed
//! listings whose path contains a segment such as `v1.0` fail with a 400.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::remote_path;
use crate::ports::{
    ApiError, ChildrenPage, ContentTransfer, DeleteOutcome, DriveApi, ItemRef, ListRequest,
    ListTarget, RemoteItem, RemoteObject, ShareKind, UserInfo,
};

/// Hash function applied to uploaded content
pub type HashFn = Arc<dyn Fn(&[u8]) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone)]
struct FakeEntry {
    id: String,
    is_folder: bool,
    content: Vec<u8>,
    hash: Option<String>,
    downloadable: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    entries: BTreeMap<String, FakeEntry>,
    calls: Vec<String>,
    next_id: u64,
}

impl FakeState {
    fn new_id(&mut self) -> String {
        self.next_id += 1;
        format!("ID{:04}", self.next_id)
    }

    fn path_of_id(&self, id: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.id == id)
            .map(|(path, _)| path.clone())
    }

    fn children(&self, parent: &str) -> Vec<String> {
        let mut folders = Vec::new();
        let mut files = Vec::new();
        for (path, entry) in &self.entries {
            if let Some((p, _)) = remote_path::split_parent(path) {
                if p == parent {
                    if entry.is_folder {
                        folders.push(path.clone());
                    } else {
                        files.push(path.clone());
                    }
                }
            }
        }
        folders.extend(files);
        folders
    }

    fn size_of(&self, path: &str) -> u64 {
        let Some(entry) = self.entries.get(path) else {
            return 0;
        };
        if !entry.is_folder {
            return entry.content.len() as u64;
        }
        let prefix = format!("{path}/");
        self.entries
            .iter()
            .filter(|(p, e)| !e.is_folder && p.starts_with(&prefix))
            .map(|(_, e)| e.content.len() as u64)
            .sum()
    }

    fn item(&self, path: &str) -> Option<RemoteItem> {
        let entry = self.entries.get(path)?;
        let (parent_path, name) = match remote_path::split_parent(path) {
            Some((parent, name)) => (Some(parent), name),
            None => (None, "root".to_string()),
        };
        let parent_id = parent_path
            .as_ref()
            .and_then(|p| self.entries.get(p))
            .map(|e| e.id.clone());
        let object = if entry.is_folder {
            RemoteObject::Folder {
                child_count: self.children(path).len() as u64,
            }
        } else {
            RemoteObject::File {
                content_hash: entry.hash.clone(),
                sha1_hash: None,
                downloadable: entry.downloadable,
            }
        };
        Some(RemoteItem {
            id: entry.id.clone(),
            name,
            size: self.size_of(path),
            parent_path,
            parent_id,
            created_at: None,
            modified_at: None,
            is_root: path.is_empty(),
            object,
        })
    }

    fn resolve(&self, item: &ItemRef) -> Result<String, ApiError> {
        let path = match item {
            ItemRef::Root => String::new(),
            ItemRef::Path(path) => {
                if remote_path::has_version_segment(path) {
                    return Err(ApiError::Remote {
                        target: path.clone(),
                        status: 400,
                        code: "BadRequest".to_string(),
                        message: "Unsupported API version".to_string(),
                    });
                }
                remote_path::canonical(path)
            }
            ItemRef::Id(id) => self.path_of_id(id).ok_or_else(|| not_found(id))?,
        };
        if self.entries.contains_key(&path) {
            Ok(path)
        } else {
            Err(not_found(&path))
        }
    }

    fn ensure_parents(&mut self, path: &str) {
        let segments = remote_path::normalize_segments(path);
        for depth in 0..segments.len() {
            let ancestor = remote_path::join_segments(&segments[..depth]);
            if !self.entries.contains_key(&ancestor) {
                let id = self.new_id();
                self.entries.insert(ancestor, folder_entry(id));
            }
        }
    }
}

fn folder_entry(id: String) -> FakeEntry {
    FakeEntry {
        id,
        is_folder: true,
        content: Vec::new(),
        hash: None,
        downloadable: false,
    }
}

fn not_found(target: &str) -> ApiError {
    ApiError::Remote {
        target: target.to_string(),
        status: 404,
        code: "itemNotFound".to_string(),
        message: "Item does not exist".to_string(),
    }
}

/// In-memory [`DriveApi`] + [`ContentTransfer`]
pub struct FakeDrive {
    state: Mutex<FakeState>,
    page_size: usize,
    hash_fn: Option<HashFn>,
}

impl Default for FakeDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDrive {
    /// Empty drive holding only the root folder
    pub fn new() -> Self {
        let mut state = FakeState::default();
        let id = state.new_id();
        state.entries.insert(String::new(), folder_entry(id));
        Self {
            state: Mutex::new(state),
            page_size: 100,
            hash_fn: None,
        }
    }

    /// Serve listings `page_size` items at a time
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Compute the content hash of uploaded files with `hash_fn`
    pub fn with_hash_fn(mut self, hash_fn: HashFn) -> Self {
        self.hash_fn = Some(hash_fn);
        self
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Add a folder (and any missing parents); returns its id
    pub fn add_folder(&self, path: &str) -> String {
        let path = remote_path::canonical(path);
        let mut state = self.lock();
        state.ensure_parents(&path);
        if let Some(entry) = state.entries.get(&path) {
            return entry.id.clone();
        }
        let id = state.new_id();
        state.entries.insert(path, folder_entry(id.clone()));
        id
    }

    /// Add a file with content and an optional server hash; returns its id
    pub fn add_file(&self, path: &str, content: &[u8], hash: Option<&str>) -> String {
        self.insert_file(path, content, hash.map(str::to_string), true)
    }

    /// Add an object that is neither a plain file nor a folder
    pub fn add_unsupported(&self, path: &str) -> String {
        self.insert_file(path, &[], None, false)
    }

    fn insert_file(
        &self,
        path: &str,
        content: &[u8],
        hash: Option<String>,
        downloadable: bool,
    ) -> String {
        let path = remote_path::canonical(path);
        let mut state = self.lock();
        if let Some((parent, _)) = remote_path::split_parent(&path) {
            state.ensure_parents(&parent);
            if !state.entries.contains_key(&parent) {
                let id = state.new_id();
                state.entries.insert(parent, folder_entry(id));
            }
        }
        let id = state.new_id();
        state.entries.insert(
            path,
            FakeEntry {
                id: id.clone(),
                is_folder: false,
                content: content.to_vec(),
                hash,
                downloadable,
            },
        );
        id
    }

    /// Metadata of the root, for building a tree
    pub fn root_item(&self) -> RemoteItem {
        self.lock()
            .item("")
            .unwrap_or_else(|| unreachable!("the fake root always exists"))
    }

    /// Metadata of any entry
    pub fn item(&self, path: &str) -> Option<RemoteItem> {
        self.lock().item(&remote_path::canonical(path))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock()
            .entries
            .contains_key(&remote_path::canonical(path))
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .entries
            .get(&remote_path::canonical(path))
            .map(|e| e.content.clone())
    }

    /// Calls received so far, e.g. `list path:/A` or `upload /A/x.txt`
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

#[async_trait::async_trait]
impl DriveApi for FakeDrive {
    async fn list_children(&self, request: &ListRequest) -> Result<ChildrenPage, ApiError> {
        let (path, offset) = match &request.target {
            ListTarget::Item(item) => {
                self.record(format!("list {item}"));
                (self.lock().resolve(item)?, 0)
            }
            ListTarget::Continuation(link) => {
                self.record("list next".to_string());
                let (offset, path) = link
                    .strip_prefix("fake-page:")
                    .and_then(|rest| rest.split_once(':'))
                    .and_then(|(offset, path)| Some((offset.parse::<usize>().ok()?, path)))
                    .ok_or_else(|| ApiError::InvalidResponse {
                        target: link.clone(),
                        reason: "malformed continuation link".to_string(),
                    })?;
                (path.to_string(), offset)
            }
        };

        let state = self.lock();
        if state.entries.get(&path).is_some_and(|e| !e.is_folder) {
            return Err(ApiError::Remote {
                target: path,
                status: 400,
                code: "notAFolder".to_string(),
                message: "Item is not a folder".to_string(),
            });
        }
        let page_size = request
            .page_size
            .map(|n| n as usize)
            .unwrap_or(self.page_size)
            .min(self.page_size)
            .max(1);
        let children: Vec<String> = state
            .children(&path)
            .into_iter()
            .filter(|p| !request.only_folders || state.entries.get(p).is_some_and(|e| e.is_folder))
            .collect();

        let items = children
            .iter()
            .skip(offset)
            .take(page_size)
            .filter_map(|p| state.item(p))
            .collect();
        let next_link = (offset + page_size < children.len())
            .then(|| format!("fake-page:{}:{}", offset + page_size, path));
        Ok(ChildrenPage { items, next_link })
    }

    async fn get_item(&self, item: &ItemRef) -> Result<RemoteItem, ApiError> {
        self.record(format!("get {item}"));
        let state = self.lock();
        let path = state.resolve(item)?;
        state.item(&path).ok_or_else(|| not_found(&path))
    }

    async fn create_folder(&self, parent: &ItemRef, name: &str) -> Result<RemoteItem, ApiError> {
        self.record(format!("mkdir {parent} {name}"));
        let mut state = self.lock();
        let parent_path = state.resolve(parent)?;

        let mut final_name = name.to_string();
        let mut suffix = 1;
        while state
            .entries
            .contains_key(&remote_path::child_path(&parent_path, &final_name))
        {
            final_name = format!("{name} {suffix}");
            suffix += 1;
        }

        let path = remote_path::child_path(&parent_path, &final_name);
        let id = state.new_id();
        state.entries.insert(path.clone(), folder_entry(id));
        state.item(&path).ok_or_else(|| not_found(&path))
    }

    async fn move_item(
        &self,
        item: &ItemRef,
        new_parent_id: &str,
        new_name: &str,
    ) -> Result<RemoteItem, ApiError> {
        self.record(format!("move {item} -> {new_parent_id}/{new_name}"));
        let mut state = self.lock();
        let source = state.resolve(item)?;
        let parent = state
            .path_of_id(new_parent_id)
            .ok_or_else(|| not_found(new_parent_id))?;
        let dest = remote_path::child_path(&parent, new_name);
        if state.entries.contains_key(&dest) {
            return Err(ApiError::Remote {
                target: dest,
                status: 409,
                code: "nameAlreadyExists".to_string(),
                message: "An item with this name already exists".to_string(),
            });
        }

        let prefix = format!("{source}/");
        let moved: Vec<String> = state
            .entries
            .keys()
            .filter(|p| **p == source || p.starts_with(&prefix))
            .cloned()
            .collect();
        for old in moved {
            if let Some(entry) = state.entries.remove(&old) {
                let new_path = format!("{dest}{}", &old[source.len()..]);
                state.entries.insert(new_path, entry);
            }
        }
        state.item(&dest).ok_or_else(|| not_found(&dest))
    }

    async fn delete_item(&self, item: &ItemRef) -> Result<DeleteOutcome, ApiError> {
        self.record(format!("delete {item}"));
        let mut state = self.lock();
        let path = match state.resolve(item) {
            Ok(path) => path,
            Err(err) if err.is_not_found() => return Ok(DeleteOutcome::NotFound),
            Err(err) => return Err(err),
        };
        if path.is_empty() {
            return Ok(DeleteOutcome::Unexpected(403));
        }
        let prefix = format!("{path}/");
        state
            .entries
            .retain(|p, _| *p != path && !p.starts_with(&prefix));
        Ok(DeleteOutcome::Deleted)
    }

    async fn create_share_link(&self, item: &ItemRef, kind: ShareKind) -> Result<String, ApiError> {
        self.record(format!("share {item} {}", kind.as_str()));
        let state = self.lock();
        let path = state.resolve(item)?;
        let id = state
            .entries
            .get(&path)
            .map(|e| e.id.clone())
            .unwrap_or_default();
        Ok(format!("https://share.example/{id}/{}", kind.as_str()))
    }

    async fn user_info(&self) -> Result<UserInfo, ApiError> {
        self.record("me".to_string());
        Ok(UserInfo {
            display_name: "Test User".to_string(),
            principal_name: "test@example.com".to_string(),
            id: "user-1".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ContentTransfer for FakeDrive {
    async fn download(&self, item: &ItemRef, name: &str, dest: &Path) -> anyhow::Result<PathBuf> {
        self.record(format!("download {item}"));
        let content = {
            let state = self.lock();
            let path = state.resolve(item)?;
            match state.entries.get(&path) {
                Some(entry) if entry.downloadable => entry.content.clone(),
                _ => anyhow::bail!("{path} is not a downloadable file"),
            }
        };
        let target = if dest.is_dir() {
            dest.join(name)
        } else {
            dest.to_path_buf()
        };
        std::fs::write(&target, content)?;
        Ok(target)
    }

    async fn upload(
        &self,
        source: &Path,
        parent: &ItemRef,
        name: &str,
    ) -> anyhow::Result<RemoteItem> {
        let content = std::fs::read(source)?;
        let hash = self.hash_fn.as_ref().and_then(|f| f(&content));
        let mut state = self.lock();
        let parent_path = state.resolve(parent)?;
        let path = remote_path::child_path(&parent_path, name);
        state.calls.push(format!("upload {path}"));
        if state.entries.get(&path).is_some_and(|e| e.is_folder) {
            anyhow::bail!("{path} is a folder");
        }
        let id = match state.entries.get(&path) {
            Some(existing) => existing.id.clone(),
            None => state.new_id(),
        };
        state.entries.insert(
            path.clone(),
            FakeEntry {
                id,
                is_folder: false,
                content,
                hash,
                downloadable: true,
            },
        );
        state
            .item(&path)
            .ok_or_else(|| anyhow::anyhow!("uploaded item vanished: {path}"))
    }
}
