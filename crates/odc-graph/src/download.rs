//! Streamed downloads
//!
//! The body is written in arrival order through a bounded buffer that is
//! flushed to disk each time it fills, so memory stays bounded and partial
//! progress is visible on disk for very large files.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use odc_core::ports::ItemRef;
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::client::{self, GraphClient};
use crate::paths;
use crate::retry::{parse_retry_after, TransferOptions};
use crate::TransferError;

/// Where a download lands
///
/// An existing directory receives the file under its remote `name`;
/// anything else is taken as the file path itself.
pub async fn destination_path(dest: &Path, name: &str) -> PathBuf {
    match tokio::fs::metadata(dest).await {
        Ok(meta) if meta.is_dir() => dest.join(name),
        _ => dest.to_path_buf(),
    }
}

/// Download `item` to `dest`, returning the written path
#[instrument(skip(client, options, item), fields(item = %item))]
pub async fn download_file(
    client: &GraphClient,
    options: &TransferOptions,
    item: &ItemRef,
    name: &str,
    dest: &Path,
) -> Result<PathBuf, TransferError> {
    let target = destination_path(dest, name).await;
    let url = paths::item_path(item, "content");
    let response = fetch_with_retry(client, options, &url, name).await?;

    let written = write_stream(response, &target, options.chunk_size).await?;
    info!(path = %target.display(), bytes = written, "Download completed");
    Ok(target)
}

/// GET the content, waiting out throttling answers
///
/// 429 and 503 are retried (when enabled) after `Retry-After`; any other
/// error status fails immediately.
async fn fetch_with_retry(
    client: &GraphClient,
    options: &TransferOptions,
    url: &str,
    name: &str,
) -> Result<Response, TransferError> {
    let mut throttled = 0u32;
    loop {
        let response = send_with_network_retry(client, options, url).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let is_throttle =
            status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE;
        if !(options.download_retry && is_throttle) {
            return match client::check(response, name).await {
                Err(err) => Err(err.into()),
                Ok(_) => Err(TransferError::UnexpectedStatus {
                    status: status.as_u16(),
                    stage: "download",
                }),
            };
        }
        if throttled >= options.download_max_retries {
            warn!(name, attempts = throttled, "Download retry limit exhausted");
            return Err(TransferError::MaxRetriesExceeded {
                attempts: throttled,
            });
        }

        throttled += 1;
        let wait = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|v| parse_retry_after(v, options.default_retry_after))
            .unwrap_or(options.default_retry_after);
        info!(
            name,
            status = status.as_u16(),
            attempt = throttled,
            retry_after_ms = wait.as_millis() as u64,
            "Download throttled, backing off"
        );
        tokio::time::sleep(wait).await;
    }
}

/// Send the request, retrying transport failures with a fixed pause
async fn send_with_network_retry(
    client: &GraphClient,
    options: &TransferOptions,
    url: &str,
) -> Result<Response, TransferError> {
    let mut failures = 0u32;
    loop {
        match client.request(Method::GET, url).send().await {
            Ok(response) => return Ok(response),
            Err(err) if failures < options.network_retries => {
                failures += 1;
                warn!(error = %err, attempt = failures, "Network error, retrying download request");
                tokio::time::sleep(options.network_retry_pause).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Write the body to `target`, flushing each time `chunk_size` bytes gathered
async fn write_stream(
    response: Response,
    target: &Path,
    chunk_size: u64,
) -> Result<u64, TransferError> {
    let capacity = chunk_size.max(1) as usize;
    let mut file = tokio::fs::File::create(target).await?;
    let mut buffer: Vec<u8> = Vec::with_capacity(capacity.min(8 * 1024 * 1024));
    let mut written = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(bytes) = stream.next().await {
        buffer.extend_from_slice(&bytes?);
        if buffer.len() >= capacity {
            file.write_all(&buffer).await?;
            file.flush().await?;
            written += buffer.len() as u64;
            debug!(written, "Flushed download chunk");
            buffer.clear();
        }
    }
    if !buffer.is_empty() {
        file.write_all(&buffer).await?;
        written += buffer.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
