//! Upload operations for Microsoft Graph API (OneDrive)
//!
//! - [`upload_small`] - single PUT for files below the simple-upload limit
//! - [`create_upload_session`] - resumable session, replacing any same-named file
//! - [`upload_session`] - strictly sequential chunk loop with resume on 5xx
//!
//! ## Microsoft Graph API References
//!
//! - [Upload small files](https://learn.microsoft.com/en-us/graph/api/driveitem-put-content)
//! - [Upload large files](https://learn.microsoft.com/en-us/graph/api/driveitem-createuploadsession)

use std::io::SeekFrom;
use std::path::Path;

use odc_core::ports::{ApiError, ItemRef, RemoteItem};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, instrument, warn};

use crate::client::{self, GraphClient};
use crate::items::GraphDriveItem;
use crate::paths;
use crate::retry::{TransferOptions, UploadBackoff};
use crate::TransferError;

// ============================================================================
// Upload session response types
// ============================================================================

/// Response from creating an upload session
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadSessionResponse {
    /// The URL to use for uploading chunks
    upload_url: String,
}

/// Response from querying an upload session
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatus {
    /// Ranges the server still expects, e.g. `["26214400-"]`
    #[serde(default)]
    next_expected_ranges: Vec<String>,
}

impl SessionStatus {
    /// Start offset of the first expected range
    fn next_offset(&self) -> Option<u64> {
        self.next_expected_ranges
            .first()
            .and_then(|range| range.split('-').next())
            .and_then(|start| start.trim().parse().ok())
    }
}

/// Why the chunk loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every byte of the file was sent
    EndOfStream,
    /// The local file yielded fewer bytes than its size announced
    TruncatedRead { expected: u64, read: u64 },
    /// The per-session chunk request limit was hit
    LoopLimit,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::EndOfStream => write!(f, "end of stream without a final item"),
            StopReason::TruncatedRead { expected, read } => {
                write!(f, "truncated read ({read} of {expected} bytes)")
            }
            StopReason::LoopLimit => write!(f, "chunk limit reached"),
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Upload the local file `source` as `name` inside `parent`
///
/// Picks the single-request or the session protocol from the file size.
#[instrument(skip(client, options, parent), fields(parent = %parent))]
pub async fn upload_file(
    client: &GraphClient,
    options: &TransferOptions,
    source: &Path,
    parent: &ItemRef,
    name: &str,
) -> Result<RemoteItem, TransferError> {
    let size = tokio::fs::metadata(source).await?.len();
    if size < options.simple_upload_limit {
        let data = tokio::fs::read(source).await?;
        return upload_small(client, parent, name, data).await;
    }

    let upload_url = create_upload_session(client, parent, name).await?;
    upload_session(client, options, &upload_url, source, size).await
}

// ============================================================================
// Small files
// ============================================================================

/// Uploads a small file in a single PUT request
///
/// Uses the simple upload API: `PUT .../{name}:/content` with the file bytes
/// as the request body.
pub async fn upload_small(
    client: &GraphClient,
    parent: &ItemRef,
    name: &str,
    data: Vec<u8>,
) -> Result<RemoteItem, TransferError> {
    let path = paths::child_item_path(parent, name, "content");
    debug!(bytes = data.len(), path = %path, "Uploading small file");

    let response = client
        .request(Method::PUT, &path)
        .header("Content-Type", "application/octet-stream")
        .body(data)
        .send()
        .await?;
    let item: GraphDriveItem = client::json(response, name).await?;

    debug!(id = %item.id, name = %item.name, "Small upload completed");
    Ok(item.into())
}

// ============================================================================
// Upload sessions
// ============================================================================

/// Creates a resumable upload session
///
/// The session replaces an existing file with the same name.
pub async fn create_upload_session(
    client: &GraphClient,
    parent: &ItemRef,
    name: &str,
) -> Result<String, TransferError> {
    let path = paths::child_item_path(parent, name, "createUploadSession");
    debug!(name, "Creating upload session");

    let body = serde_json::json!({
        "item": { "@microsoft.graph.conflictBehavior": "replace" }
    });
    let response = client.request(Method::POST, &path).json(&body).send().await?;
    let session: UploadSessionResponse = client::json(response, name).await?;

    debug!(url = %session.upload_url, "Upload session created");
    Ok(session.upload_url)
}

/// Send `source` through an open session, chunk by chunk
///
/// - 200/201: final chunk accepted, the body is the created item
/// - 202: chunk accepted, continue
/// - 500/502/503/504: ask the session where to resume, seek, back off
/// - 404: the session expired
/// - anything else: fatal
///
/// An unfinished session is cancelled before returning an error.
pub async fn upload_session(
    client: &GraphClient,
    options: &TransferOptions,
    upload_url: &str,
    source: &Path,
    total: u64,
) -> Result<RemoteItem, TransferError> {
    let mut file = File::open(source).await?;
    let chunk_size = options.chunk_size.max(1);
    let mut buffer = vec![0u8; chunk_size.min(total.max(1)) as usize];
    let mut backoff = UploadBackoff::new(options.upload_initial_delay, options.upload_max_retries);
    let mut offset = 0u64;
    let mut requests = 0u32;

    let stop_reason = loop {
        if offset >= total {
            break StopReason::EndOfStream;
        }
        if requests >= options.max_upload_chunks {
            break StopReason::LoopLimit;
        }
        requests += 1;

        let wanted = chunk_size.min(total - offset);
        let read = read_chunk(&mut file, &mut buffer[..wanted as usize]).await?;
        if (read as u64) < wanted {
            break StopReason::TruncatedRead {
                expected: wanted,
                read: read as u64,
            };
        }

        let status = match put_chunk(client, upload_url, &buffer[..read], offset, total).await {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::OK || status == StatusCode::CREATED {
                    let item: GraphDriveItem = client::json(response, "upload session").await?;
                    info!(bytes = total, name = %item.name, "Upload completed");
                    return Ok(item.into());
                }
                status
            }
            Err(err) => {
                cancel_session(client, upload_url).await;
                return Err(err.into());
            }
        };

        match status.as_u16() {
            202 => {
                offset += read as u64;
                backoff.reset();
                debug!(offset, total, "Chunk accepted");
            }
            500 | 502 | 503 | 504 => {
                let Some(delay) = backoff.next_delay() else {
                    cancel_session(client, upload_url).await;
                    return Err(TransferError::MaxRetriesExceeded {
                        attempts: backoff.retries(),
                    });
                };
                offset = resume_offset(client, upload_url, offset).await?;
                file.seek(SeekFrom::Start(offset)).await?;
                warn!(
                    status = status.as_u16(),
                    offset,
                    retry = backoff.retries(),
                    delay_ms = delay.as_millis() as u64,
                    "Server error during upload, resuming"
                );
                tokio::time::sleep(delay).await;
            }
            404 => return Err(TransferError::SessionExpired),
            other => {
                cancel_session(client, upload_url).await;
                return Err(TransferError::UnexpectedStatus {
                    status: other,
                    stage: "chunk upload",
                });
            }
        }
    };

    cancel_session(client, upload_url).await;
    Err(TransferError::Incomplete {
        stop_reason,
        uploaded: offset,
        total,
    })
}

/// PUT one chunk with its `Content-Range`
///
/// The session URL is pre-authenticated; no bearer header is sent.
async fn put_chunk(
    client: &GraphClient,
    upload_url: &str,
    data: &[u8],
    offset: u64,
    total: u64,
) -> Result<reqwest::Response, reqwest::Error> {
    let range_end = offset + data.len() as u64 - 1;
    let content_range = format!("bytes {offset}-{range_end}/{total}");
    debug!(range = %content_range, "Uploading chunk");

    client
        .http_client()
        .put(upload_url)
        .header("Content-Length", data.len().to_string())
        .header("Content-Range", content_range)
        .body(data.to_vec())
        .send()
        .await
}

/// Ask the session which byte it expects next
///
/// Keeps `current` when the server does not report a range.
async fn resume_offset(
    client: &GraphClient,
    upload_url: &str,
    current: u64,
) -> Result<u64, TransferError> {
    let response = client.http_client().get(upload_url).send().await?;
    if response.status() == StatusCode::NOT_FOUND {
        return Err(TransferError::SessionExpired);
    }
    let status: SessionStatus = match client::json(response, "upload session").await {
        Ok(status) => status,
        Err(ApiError::Remote { status, .. }) => {
            return Err(TransferError::UnexpectedStatus {
                status,
                stage: "session status",
            })
        }
        Err(err) => return Err(err.into()),
    };
    Ok(status.next_offset().unwrap_or_else(|| {
        debug!(current, "Session reported no expected range");
        current
    }))
}

/// Best-effort removal of an unfinished session
async fn cancel_session(client: &GraphClient, upload_url: &str) {
    match client.http_client().delete(upload_url).send().await {
        Ok(response) => debug!(status = response.status().as_u16(), "Upload session cancelled"),
        Err(err) => debug!(error = %err, "Failed to cancel upload session"),
    }
}

/// Fill `buffer` from `file`, stopping early only at end of file
async fn read_chunk(file: &mut File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}
