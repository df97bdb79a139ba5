//! Configuration module for ODC.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Upload chunks must be a multiple of this many bytes (320 KiB).
pub const CHUNK_ALIGNMENT: u64 = 320 * 1024;

const MIB: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for ODC.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transfer: TransferConfig,
    pub listing: ListingConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub graph: GraphConfig,
}

/// Upload / download protocol settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Files below this size (in MiB) are uploaded with a single PUT.
    pub simple_upload_limit_mb: u64,
    /// Size of each upload chunk and of the download buffer (in MiB).
    pub chunk_size_mb: u64,
    /// Consecutive 5xx retries allowed per upload session.
    pub upload_max_retries: u32,
    /// First upload backoff (seconds); doubled on each consecutive retry.
    pub upload_initial_delay_secs: u64,
    /// Retry throttled (429/503) downloads.
    pub download_retry: bool,
    /// Throttling retries allowed per download.
    pub download_max_retries: u32,
    /// Wait used when a throttled response has no `Retry-After` header.
    pub download_default_retry_after_secs: u64,
    /// Retries after a transport error on the initial download request.
    pub network_retries: u32,
    /// Fixed pause between transport-error retries (seconds).
    pub network_retry_pause_secs: u64,
    /// Upper bound of chunk requests per upload session.
    pub max_upload_chunks: u32,
}

/// Listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Items requested per listing page.
    pub page_size: u32,
    /// Default recursion depth of bulk transfers.
    pub max_depth: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Token storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Keyring user name the access token is stored under.
    pub account: String,
}

/// Microsoft Graph endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// API base URL, version included.
    pub base_url: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/odc/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("odc")
            .join("config.yaml")
    }
}

impl TransferConfig {
    pub fn simple_upload_limit_bytes(&self) -> u64 {
        self.simple_upload_limit_mb * MIB
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_mb * MIB
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            simple_upload_limit_mb: 4,
            chunk_size_mb: 20,
            upload_max_retries: 5,
            upload_initial_delay_secs: 15,
            download_retry: true,
            download_max_retries: 5,
            download_default_retry_after_secs: 11,
            network_retries: 3,
            network_retry_pause_secs: 10,
            max_upload_chunks: 2000,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            max_depth: 999,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            account: "default".to_string(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.microsoft.com/v1.0".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transfer.chunk_size_mb"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- transfer ---
        let t = &self.transfer;
        positive(&mut errors, "transfer.simple_upload_limit_mb", t.simple_upload_limit_mb);
        positive(&mut errors, "transfer.chunk_size_mb", t.chunk_size_mb);
        if t.chunk_size_mb > 0 && t.chunk_size_bytes() % CHUNK_ALIGNMENT != 0 {
            errors.push(ValidationError {
                field: "transfer.chunk_size_mb".into(),
                message: "must be a multiple of 320 KiB (use a multiple of 5 MiB)".into(),
            });
        }
        if t.chunk_size_mb > 60 {
            errors.push(ValidationError {
                field: "transfer.chunk_size_mb".into(),
                message: "must not exceed 60".into(),
            });
        }
        positive(&mut errors, "transfer.upload_max_retries", t.upload_max_retries.into());
        positive(&mut errors, "transfer.upload_initial_delay_secs", t.upload_initial_delay_secs);
        positive(&mut errors, "transfer.download_max_retries", t.download_max_retries.into());
        positive(
            &mut errors,
            "transfer.download_default_retry_after_secs",
            t.download_default_retry_after_secs,
        );
        positive(&mut errors, "transfer.max_upload_chunks", t.max_upload_chunks.into());

        // --- listing ---
        positive(&mut errors, "listing.page_size", self.listing.page_size.into());
        if self.listing.page_size > 999 {
            errors.push(ValidationError {
                field: "listing.page_size".into(),
                message: "must not exceed 999".into(),
            });
        }
        positive(&mut errors, "listing.max_depth", self.listing.max_depth.into());

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid log level '{}'; expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- auth ---
        if self.auth.account.trim().is_empty() {
            errors.push(ValidationError {
                field: "auth.account".into(),
                message: "must not be empty".into(),
            });
        }

        // --- graph ---
        let url = &self.graph.base_url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            errors.push(ValidationError {
                field: "graph.base_url".into(),
                message: format!("not an http(s) URL: {url}"),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- transfer ---

    pub fn simple_upload_limit_mb(mut self, mb: u64) -> Self {
        self.config.transfer.simple_upload_limit_mb = mb;
        self
    }

    pub fn chunk_size_mb(mut self, mb: u64) -> Self {
        self.config.transfer.chunk_size_mb = mb;
        self
    }

    pub fn upload_retries(mut self, max_retries: u32, initial_delay_secs: u64) -> Self {
        self.config.transfer.upload_max_retries = max_retries;
        self.config.transfer.upload_initial_delay_secs = initial_delay_secs;
        self
    }

    pub fn download_retry(mut self, enabled: bool, max_retries: u32) -> Self {
        self.config.transfer.download_retry = enabled;
        self.config.transfer.download_max_retries = max_retries;
        self
    }

    // --- listing ---

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.listing.page_size = page_size;
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.config.listing.max_depth = depth;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    // --- auth / graph ---

    pub fn auth_account(mut self, account: impl Into<String>) -> Self {
        self.config.auth.account = account.into();
        self
    }

    pub fn graph_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.graph.base_url = url.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
