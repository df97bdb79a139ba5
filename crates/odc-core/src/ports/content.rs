//! Content ports: file transfer and content hashing
//!
//! Transfers move whole file contents between the local filesystem and the
//! drive. Hashing computes the QuickXorHash used to decide whether a transfer
//! is needed at all.

use std::path::{Path, PathBuf};

use super::drive_api::{ItemRef, RemoteItem};

/// Port trait for moving file contents
///
/// Uses `anyhow::Result` because transfer failures are adapter-specific;
/// callers only need to report them per item.
#[async_trait::async_trait]
pub trait ContentTransfer: Send + Sync {
    /// Download the file `item` (remote base name `name`) to `dest`
    ///
    /// When `dest` is an existing directory the file is written inside it
    /// under `name`. Returns the path that was written.
    async fn download(&self, item: &ItemRef, name: &str, dest: &Path) -> anyhow::Result<PathBuf>;

    /// Upload the local file `source` as `name` inside `parent`
    ///
    /// Returns the metadata of the uploaded item.
    async fn upload(&self, source: &Path, parent: &ItemRef, name: &str)
        -> anyhow::Result<RemoteItem>;
}

/// Port trait for the content hash collaborator
///
/// `None` means the hash is unavailable, which callers treat as "always
/// transfer".
#[async_trait::async_trait]
pub trait ContentHasher: Send + Sync {
    async fn hash(&self, path: &Path) -> Option<String>;
}
