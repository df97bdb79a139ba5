//! ODC Sync - Bulk folder transfers between a local directory and the drive
//!
//! - [`engine::SyncEngine`] walks a remote folder and a local directory in
//!   lock-step, in either direction, with a depth bound
//! - [`compare`] holds the "needs transfer" predicate both directions share
//! - [`hashing`] computes QuickXorHash, the digest OneDrive reports for files
//! - [`report::SyncReport`] collects per-item outcomes; one failing item
//!   never stops the batch

use std::path::PathBuf;

use odc_core::usecases::OperationError;
use thiserror::Error;

pub mod compare;
pub mod engine;
pub mod hashing;
pub mod report;

pub use engine::SyncEngine;
pub use hashing::{QuickXorHash, QuickXorHasher};
pub use report::{FailedItem, SyncReport};

/// Failure that aborts a whole transfer before any item is processed
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote side could not be resolved (missing, not a folder, API error)
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("Local path is not a directory: {}", .0.display())]
    LocalNotADirectory(PathBuf),

    #[error("Local path is not a file: {}", .0.display())]
    LocalNotAFile(PathBuf),

    /// The remote object is neither a plain file nor a folder
    #[error("Remote object cannot be downloaded: {0}")]
    Unsupported(String),

    /// A single-file transfer failed
    #[error("{0:#}")]
    Transfer(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
