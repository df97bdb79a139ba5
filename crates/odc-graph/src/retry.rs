//! Retry policy for content transfers
//!
//! - [`TransferOptions`] - limits and delays, built from [`TransferConfig`]
//! - [`UploadBackoff`] - doubling delay for 5xx answers during uploads
//! - [`parse_retry_after`] - `Retry-After` header parsing for throttled downloads

use std::time::Duration;

use odc_core::config::TransferConfig;
use tracing::warn;

/// Longest wait accepted from an HTTP-date `Retry-After`
const MAX_RETRY_AFTER_SECS: u64 = 3600;

/// Tunables of the upload and download protocols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// Files strictly smaller than this are uploaded with one PUT
    pub simple_upload_limit: u64,
    /// Upload chunk size and download write-buffer size, in bytes
    pub chunk_size: u64,
    pub upload_max_retries: u32,
    pub upload_initial_delay: Duration,
    pub download_retry: bool,
    pub download_max_retries: u32,
    /// Wait used when a throttled response has no `Retry-After`
    pub default_retry_after: Duration,
    pub network_retries: u32,
    pub network_retry_pause: Duration,
    /// Upper bound of chunk requests in one upload session
    pub max_upload_chunks: u32,
}

impl From<&TransferConfig> for TransferOptions {
    fn from(config: &TransferConfig) -> Self {
        Self {
            simple_upload_limit: config.simple_upload_limit_bytes(),
            chunk_size: config.chunk_size_bytes(),
            upload_max_retries: config.upload_max_retries,
            upload_initial_delay: Duration::from_secs(config.upload_initial_delay_secs),
            download_retry: config.download_retry,
            download_max_retries: config.download_max_retries,
            default_retry_after: Duration::from_secs(config.download_default_retry_after_secs),
            network_retries: config.network_retries,
            network_retry_pause: Duration::from_secs(config.network_retry_pause_secs),
            max_upload_chunks: config.max_upload_chunks,
        }
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::from(&TransferConfig::default())
    }
}

/// Consecutive-retry budget with a doubling delay
///
/// Every successful chunk resets the budget, so only an unbroken run of
/// server errors can exhaust it.
#[derive(Debug, Clone)]
pub struct UploadBackoff {
    initial: Duration,
    delay: Duration,
    retries: u32,
    max_retries: u32,
}

impl UploadBackoff {
    pub fn new(initial: Duration, max_retries: u32) -> Self {
        Self {
            initial,
            delay: initial,
            retries: 0,
            max_retries,
        }
    }

    /// Delay to wait before the next retry, or `None` once exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }
        self.retries += 1;
        let delay = self.delay;
        self.delay = self.delay.saturating_mul(2);
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.retries = 0;
        self.delay = self.initial;
    }

    /// Retries used since the last reset
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// Parses a `Retry-After` header value
///
/// The value may be either:
/// - An integer number of seconds (e.g., "120")
/// - An HTTP-date (e.g., "Wed, 21 Oct 2015 07:28:00 GMT")
///
/// Falls back to `default` if parsing fails or the date lies more than an
/// hour ahead.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let remaining = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Ok(secs) = u64::try_from(remaining.num_seconds()) {
            if secs <= MAX_RETRY_AFTER_SECS {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
