//! Access token storage
//!
//! Acquiring and refreshing OAuth tokens is left to an external tool; ODC
//! only needs a bearer token. It is looked up in this order:
//!
//! 1. The `ODC_ACCESS_TOKEN` environment variable
//! 2. The system keyring (service "odc", user = configured account)

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Keyring service name
pub const KEYRING_SERVICE: &str = "odc";

/// Environment variable that overrides the keyring
pub const TOKEN_ENV_VAR: &str = "ODC_ACCESS_TOKEN";

/// Where a loaded token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Keyring,
}

/// Stores and retrieves the access token for one account
#[derive(Debug, Clone)]
pub struct TokenStore {
    account: String,
}

impl TokenStore {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, &self.account).context("Failed to create keyring entry")
    }

    /// Load the token, environment first
    ///
    /// Returns `None` when neither source has one.
    pub fn load(&self) -> Result<Option<(String, TokenSource)>> {
        if let Some(token) = token_from_env(std::env::var(TOKEN_ENV_VAR).ok()) {
            debug!("Using access token from {}", TOKEN_ENV_VAR);
            return Ok(Some((token, TokenSource::Environment)));
        }

        match self.entry()?.get_password() {
            Ok(token) => {
                debug!(account = %self.account, "Loaded access token from keyring");
                Ok(Some((token, TokenSource::Keyring)))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account = %self.account, "No access token in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Store `token` in the keyring
    pub fn store(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            anyhow::bail!("Refusing to store an empty access token");
        }
        self.entry()?
            .set_password(token)
            .context("Failed to store access token in keyring")?;
        info!(account = %self.account, "Stored access token in keyring");
        Ok(())
    }

    /// Remove the stored token; returns whether one existed
    pub fn clear(&self) -> Result<bool> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                info!(account = %self.account, "Cleared access token from keyring");
                Ok(true)
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account = %self.account, "No access token to clear");
                Ok(false)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

/// A non-blank environment value, trimmed
fn token_from_env(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
