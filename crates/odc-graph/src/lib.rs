//! ODC Graph - Microsoft Graph adapter for the ODC core
//!
//! Provides:
//! - A thin authenticated HTTP client over `reqwest`
//! - [`GraphDrive`], implementing the core's `DriveApi` and `ContentTransfer`
//!   ports against OneDrive
//! - Chunked, resumable uploads and streamed downloads with retry
//! - Access token storage in the system keyring
//!
//! ## Modules
//!
//! - [`auth`] - access token storage
//! - [`client`] - Microsoft Graph HTTP client
//! - [`items`] - DriveItem JSON to port DTO conversion
//! - [`paths`] - endpoint construction for path/id addressing
//! - [`provider`] - the port implementations
//! - [`retry`] - retry/backoff policy and `Retry-After` parsing
//! - [`upload`] / [`download`] - the content transfer protocols

pub mod auth;
pub mod client;
pub mod download;
pub mod items;
pub mod paths;
pub mod provider;
pub mod retry;
pub mod upload;

use odc_core::ports::ApiError;
use thiserror::Error;

pub use client::GraphClient;
pub use provider::GraphDrive;
pub use retry::TransferOptions;
pub use upload::StopReason;

/// Errors that terminate a single upload or download
#[derive(Debug, Error)]
pub enum TransferError {
    /// The upload session no longer exists; the upload must start over
    #[error("Upload session expired")]
    SessionExpired,

    /// The server answered with a status the protocol does not handle
    #[error("Unexpected status {status} during {stage}")]
    UnexpectedStatus { status: u16, stage: &'static str },

    /// Retries were exhausted
    #[error("Gave up after {attempts} retries")]
    MaxRetriesExceeded { attempts: u32 },

    /// The transfer stopped before the whole file was accepted
    #[error("Upload incomplete after {uploaded} of {total} bytes: {stop_reason}")]
    Incomplete {
        stop_reason: StopReason,
        uploaded: u64,
        total: u64,
    },

    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected a request with an error body
    #[error(transparent)]
    Api(#[from] ApiError),
}
