//! The "needs transfer" predicate shared by both sync directions

use std::path::Path;

use odc_core::ports::ContentHasher;

/// Whether a source file must be copied over its destination
///
/// A missing destination always needs the transfer. Otherwise both hashes
/// must be known and equal for the transfer to be skipped; an unknown hash
/// on either side means "transfer".
pub fn needs_transfer(
    destination_exists: bool,
    remote_hash: Option<&str>,
    local_hash: Option<&str>,
) -> bool {
    if !destination_exists {
        return true;
    }
    match (remote_hash, local_hash) {
        (Some(remote), Some(local)) => remote != local,
        _ => true,
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Whether a remote file must be downloaded over `local`
///
/// The local file is hashed only when the answer depends on it.
pub async fn download_needed(
    hasher: &dyn ContentHasher,
    local: &Path,
    remote_hash: Option<&str>,
) -> bool {
    if !is_file(local).await || remote_hash.is_none() {
        return true;
    }
    needs_transfer(true, remote_hash, hasher.hash(local).await.as_deref())
}

/// Whether `local` must be uploaded over a remote file
///
/// `remote_exists` is false when no remote file has the name yet.
pub async fn upload_needed(
    hasher: &dyn ContentHasher,
    local: &Path,
    remote_exists: bool,
    remote_hash: Option<&str>,
) -> bool {
    if !remote_exists || remote_hash.is_none() {
        return true;
    }
    needs_transfer(true, remote_hash, hasher.hash(local).await.as_deref())
}
