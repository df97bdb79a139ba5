//! Bulk transfer engine
//!
//! [`SyncEngine`] mirrors a remote folder into a local directory
//! ([`SyncEngine::sync_download`]) or a local directory into a remote folder
//! ([`SyncEngine::sync_upload`]). Both walk the two trees in lock-step with an
//! explicit work stack, one folder at a time:
//!
//! 1. Retrieve every child of the remote folder
//! 2. Transfer the files that need it (see [`crate::compare`])
//! 3. Queue subfolders while the depth bound allows
//!
//! A failing item is recorded in the [`SyncReport`] and the batch moves on.
//! Only problems with the starting folders abort the whole run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use odc_core::domain::{remote_path, DisplayRecord, NodeId, TreeError};
use odc_core::ports::{ContentHasher, ContentTransfer};
use odc_core::usecases::{DriveSession, OperationError, Target};
use tracing::{debug, info, instrument, warn};

use crate::compare::{download_needed, upload_needed};
use crate::report::SyncReport;
use crate::SyncError;

/// Remote file facts copied out of the tree before any await
struct RemoteFile {
    node: NodeId,
    path: String,
    name: String,
    content_hash: Option<String>,
    downloadable: bool,
}

/// Drives bulk and single-file transfers against a [`DriveSession`]
pub struct SyncEngine {
    transfer: Arc<dyn ContentTransfer>,
    hasher: Arc<dyn ContentHasher>,
}

impl SyncEngine {
    pub fn new(transfer: Arc<dyn ContentTransfer>, hasher: Arc<dyn ContentHasher>) -> Self {
        Self { transfer, hasher }
    }

    // ========================================================================
    // Single files
    // ========================================================================

    /// Download the remote file at `remote` to `local`
    ///
    /// `local` may be a directory, in which case the remote name is kept.
    pub async fn get_file(
        &self,
        session: &mut DriveSession,
        remote: &str,
        local: &Path,
    ) -> Result<PathBuf, SyncError> {
        let node = match session.locate(remote).await? {
            Target::File(id) => id,
            Target::Folder(id) => {
                return Err(OperationError::from(TreeError::NotAFile(session.tree().path(id))).into())
            }
            Target::Missing { .. } => {
                return Err(OperationError::PathNotFound(remote.to_string()).into())
            }
        };
        let file = remote_file(session, node)?;
        if !file.downloadable {
            return Err(SyncError::Unsupported(file.path));
        }

        let item = session.item_ref(node)?;
        let written = self
            .transfer
            .download(&item, &file.name, local)
            .await
            .map_err(SyncError::Transfer)?;
        info!(remote = %file.path, local = %written.display(), "Downloaded file");
        Ok(written)
    }

    /// Upload `local` into the remote folder `remote_folder`, replacing a
    /// same-named file
    pub async fn put_file(
        &self,
        session: &mut DriveSession,
        local: &Path,
        remote_folder: &str,
    ) -> Result<DisplayRecord, SyncError> {
        let is_file = tokio::fs::metadata(local).await?.is_file();
        let name = match local.file_name().and_then(|n| n.to_str()) {
            Some(name) if is_file => name.to_string(),
            _ => return Err(SyncError::LocalNotAFile(local.to_path_buf())),
        };
        let folder = session.folder_at(remote_folder).await?;
        if let Some(existing) = session.child(folder, &name).await? {
            if session.tree().node(existing).map_err(OperationError::from)?.is_folder() {
                return Err(OperationError::from(TreeError::NotAFile(
                    session.tree().path(existing),
                ))
                .into());
            }
        }

        let parent = session.item_ref(folder)?;
        let item = self
            .transfer
            .upload(local, &parent, &name)
            .await
            .map_err(SyncError::Transfer)?;
        let node = session.apply_upload(folder, &item)?;
        info!(local = %local.display(), remote = %session.tree().path(node), "Uploaded file");
        Ok(session
            .tree()
            .describe(node)
            .map_err(OperationError::from)?)
    }

    // ========================================================================
    // Download direction
    // ========================================================================

    /// Mirror the remote folder `remote_folder` into `local`
    ///
    /// Files whose remote path is listed in `excluded` are skipped, as are
    /// whole folders listed there. `max_depth` 1 transfers only the direct
    /// files of `remote_folder`.
    #[instrument(skip(self, session, local, excluded), fields(local = %local.display()))]
    pub async fn sync_download(
        &self,
        session: &mut DriveSession,
        remote_folder: &str,
        local: &Path,
        max_depth: u32,
        excluded: &[String],
    ) -> Result<SyncReport, SyncError> {
        let root = session.folder_at(remote_folder).await?;
        ensure_local_dir(local).await?;

        let cwd = session.tree().path(session.cwd());
        let excluded: HashSet<String> = excluded
            .iter()
            .map(|p| remote_path::join_segments(&remote_path::absolutize(&cwd, p)))
            .collect();

        let mut report = SyncReport::new();
        if max_depth == 0 {
            return Ok(report);
        }

        let mut pending = vec![(root, local.to_path_buf(), max_depth)];
        while let Some((folder, dir, depth)) = pending.pop() {
            let folder_path = session.tree().path(folder);
            debug!(remote = %folder_path, local = %dir.display(), depth, "Downloading folder");

            if let Err(err) = session.retrieve_all(folder).await {
                warn!(remote = %folder_path, error = %err, "Could not list folder");
                report.fail(folder_path, err);
                continue;
            }

            let files: Vec<NodeId> = session.tree().child_files(folder).to_vec();
            for node in files {
                let file = match remote_file(session, node) {
                    Ok(file) => file,
                    Err(err) => {
                        report.fail(session.tree().path(node), err);
                        continue;
                    }
                };
                self.download_one(session, &file, &dir, &excluded, &mut report)
                    .await;
            }

            let folders: Vec<NodeId> = session.tree().child_folders(folder).to_vec();
            // Reverse so the stack pops subfolders in listing order
            for node in folders.into_iter().rev() {
                let path = session.tree().path(node);
                if excluded.contains(&path) {
                    debug!(remote = %path, "Excluded");
                    report.skip(path, None);
                    continue;
                }
                if depth <= 1 {
                    debug!(remote = %path, "Depth limit, not descending");
                    continue;
                }
                let name = session
                    .tree()
                    .node(node)
                    .map(|n| n.name().to_string())
                    .unwrap_or_default();
                let sub = dir.join(&name);
                match ensure_local_dir(&sub).await {
                    Ok(()) => pending.push((node, sub, depth - 1)),
                    Err(SyncError::LocalNotADirectory(_)) => {
                        let warning = format!(
                            "{} exists locally and is not a directory, skipping {path}",
                            sub.display()
                        );
                        warn!("{warning}");
                        report.skip(path, Some(warning));
                    }
                    Err(err) => report.fail(path, err),
                }
            }
        }

        info!(summary = %report.summary(), "Download finished");
        Ok(report)
    }

    async fn download_one(
        &self,
        session: &DriveSession,
        file: &RemoteFile,
        dir: &Path,
        excluded: &HashSet<String>,
        report: &mut SyncReport,
    ) {
        if excluded.contains(&file.path) {
            debug!(remote = %file.path, "Excluded");
            report.skip(file.path.clone(), None);
            return;
        }
        if !file.downloadable {
            let warning = format!("{} is not a plain file, skipping", file.path);
            warn!("{warning}");
            report.skip(file.path.clone(), Some(warning));
            return;
        }

        let target = dir.join(&file.name);
        if tokio::fs::metadata(&target).await.is_ok_and(|m| m.is_dir()) {
            let warning = format!(
                "{} is a remote file but a local directory, skipping",
                file.path
            );
            warn!("{warning}");
            report.skip(file.path.clone(), Some(warning));
            return;
        }

        if !download_needed(self.hasher.as_ref(), &target, file.content_hash.as_deref()).await {
            debug!(remote = %file.path, local = %target.display(), "No need to download");
            report.unchanged.push(file.path.clone());
            return;
        }

        let item = match session.item_ref(file.node) {
            Ok(item) => item,
            Err(err) => {
                report.fail(file.path.clone(), err);
                return;
            }
        };
        info!(remote = %file.path, local = %target.display(), "Downloading");
        match self.transfer.download(&item, &file.name, &target).await {
            Ok(_) => report.transferred.push(file.path.clone()),
            Err(err) => {
                warn!(remote = %file.path, error = %format!("{err:#}"), "Download failed");
                report.fail(file.path.clone(), err);
            }
        }
    }

    // ========================================================================
    // Upload direction
    // ========================================================================

    /// Mirror the local directory `local` into the remote folder
    /// `remote_folder`
    ///
    /// Missing remote subfolders are created. Directories below `max_depth`
    /// are created but not descended into.
    #[instrument(skip(self, session, local), fields(local = %local.display()))]
    pub async fn sync_upload(
        &self,
        session: &mut DriveSession,
        local: &Path,
        remote_folder: &str,
        max_depth: u32,
    ) -> Result<SyncReport, SyncError> {
        if !tokio::fs::metadata(local).await?.is_dir() {
            return Err(SyncError::LocalNotADirectory(local.to_path_buf()));
        }
        let root = session.folder_at(remote_folder).await?;

        let mut report = SyncReport::new();
        if max_depth == 0 {
            return Ok(report);
        }

        let mut pending = vec![(local.to_path_buf(), root, max_depth)];
        while let Some((dir, folder, depth)) = pending.pop() {
            debug!(local = %dir.display(), remote = %session.tree().path(folder), depth, "Uploading directory");

            if let Err(err) = session.retrieve_all(folder).await {
                warn!(remote = %session.tree().path(folder), error = %err, "Could not list folder");
                report.fail(dir.display().to_string(), err);
                continue;
            }

            let entries = match sorted_entries(&dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    report.fail(dir.display().to_string(), err);
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            for path in entries {
                let shown = path.display().to_string();
                let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
                else {
                    let warning = format!("{shown} has a name that is not valid UTF-8, skipping");
                    warn!("{warning}");
                    report.skip(shown, Some(warning));
                    continue;
                };

                let metadata = match tokio::fs::metadata(&path).await {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        report.fail(shown, err);
                        continue;
                    }
                };

                if metadata.is_file() {
                    self.upload_one(session, folder, &path, &name, &mut report)
                        .await;
                } else if metadata.is_dir() {
                    if let Some(file) = session.tree().child_file(folder, &name) {
                        let warning = format!(
                            "{shown} is a local directory but {} is a remote file, skipping",
                            session.tree().path(file)
                        );
                        warn!("{warning}");
                        report.skip(shown, Some(warning));
                        continue;
                    }
                    match session.ensure_folder(folder, &name).await {
                        Ok(sub) if depth > 1 => subdirs.push((path, sub, depth - 1)),
                        Ok(_) => {
                            let warning = format!("{shown}: max depth reached, not descending");
                            warn!("{warning}");
                            report.warnings.push(warning);
                        }
                        Err(err) => {
                            warn!(local = %shown, error = %err, "Could not create remote folder");
                            report.fail(shown, err);
                        }
                    }
                } else {
                    let warning = format!("{shown} is neither a file nor a directory, skipping");
                    warn!("{warning}");
                    report.skip(shown, Some(warning));
                }
            }
            pending.extend(subdirs.into_iter().rev());
        }

        info!(summary = %report.summary(), "Upload finished");
        Ok(report)
    }

    async fn upload_one(
        &self,
        session: &mut DriveSession,
        folder: NodeId,
        path: &Path,
        name: &str,
        report: &mut SyncReport,
    ) {
        let shown = path.display().to_string();
        if let Some(remote) = session.tree().child_folder(folder, name) {
            let warning = format!(
                "{shown} is a local file but {} is a remote folder, skipping",
                session.tree().path(remote)
            );
            warn!("{warning}");
            report.skip(shown, Some(warning));
            return;
        }

        let existing = session.tree().child_file(folder, name);
        let remote_hash = existing
            .and_then(|id| session.tree().file(id).ok())
            .and_then(|f| f.content_hash.clone());
        if !upload_needed(
            self.hasher.as_ref(),
            path,
            existing.is_some(),
            remote_hash.as_deref(),
        )
        .await
        {
            debug!(local = %shown, "No need to upload");
            report.unchanged.push(shown);
            return;
        }

        let parent = match session.item_ref(folder) {
            Ok(parent) => parent,
            Err(err) => {
                report.fail(shown, err);
                return;
            }
        };
        info!(local = %shown, remote = %session.tree().path(folder), "Uploading");
        let item = match self.transfer.upload(path, &parent, name).await {
            Ok(item) => item,
            Err(err) => {
                warn!(local = %shown, error = %format!("{err:#}"), "Upload failed");
                report.fail(shown, err);
                return;
            }
        };
        match session.apply_upload(folder, &item) {
            Ok(_) => report.transferred.push(shown),
            Err(err) => report.fail(shown, err),
        }
    }
}

fn remote_file(session: &DriveSession, node: NodeId) -> Result<RemoteFile, OperationError> {
    let tree = session.tree();
    let name = tree.node(node)?.name().to_string();
    let file = tree.file(node)?;
    Ok(RemoteFile {
        node,
        path: tree.path(node),
        name,
        content_hash: file.content_hash.clone(),
        downloadable: file.downloadable,
    })
}

/// Create `dir` if missing; an existing non-directory is refused
async fn ensure_local_dir(dir: &Path) -> Result<(), SyncError> {
    match tokio::fs::metadata(dir).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(SyncError::LocalNotADirectory(dir.to_path_buf())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(local = %dir.display(), "Creating directory");
            tokio::fs::create_dir_all(dir).await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}
