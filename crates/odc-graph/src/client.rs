//! Microsoft Graph API client
//!
//! Provides an authenticated HTTP client for the Microsoft Graph API.
//! Handles the bearer header, base URL construction, and the translation of
//! error responses into [`ApiError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use odc_graph::client::GraphClient;
//! use reqwest::Method;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GraphClient::new("access-token-here");
//! let response = client.request(Method::GET, "/me").send().await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

use odc_core::ports::ApiError;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Base URL for Microsoft Graph API v1.0
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

// ============================================================================
// Error body
// ============================================================================

/// `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

// ============================================================================
// GraphClient
// ============================================================================

/// HTTP client for Microsoft Graph API calls
///
/// Wraps `reqwest::Client` with authentication headers and base URL
/// construction. Token refresh is not handled here: a rejected token
/// surfaces as [`ApiError::Unauthorized`].
#[derive(Debug, Clone)]
pub struct GraphClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Current OAuth2 access token
    access_token: String,
}

impl GraphClient {
    /// Creates a new GraphClient with the given access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, GRAPH_BASE_URL)
    }

    /// Creates a new GraphClient with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Updates the access token
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated GraphClient access token");
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Creates an authenticated request builder for an API path
    ///
    /// `path` is relative to the base URL (e.g. "/me/drive/root").
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.request_url(method, &url)
    }

    /// Creates an authenticated request builder for an absolute URL
    ///
    /// Used for continuation links, which the server returns fully formed.
    pub fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.access_token)
    }

    /// Returns a reference to the underlying HTTP client
    ///
    /// Upload session URLs are pre-authenticated and must be called without
    /// the bearer header.
    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// ============================================================================
// Response helpers
// ============================================================================

/// Pass a successful response through, or turn it into an [`ApiError`]
///
/// `target` names what was requested (a path, an id, "me") so callers can
/// tell which lookup failed.
pub async fn check(response: Response, target: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (
            status.canonical_reason().unwrap_or("unknown").to_string(),
            body,
        ),
    };

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized(if message.is_empty() {
            code
        } else {
            message
        }));
    }

    debug!(target, status = status.as_u16(), code = %code, "Graph request failed");
    Err(ApiError::Remote {
        target: target.to_string(),
        status: status.as_u16(),
        code,
        message,
    })
}

/// Check a response and decode its JSON body
pub async fn json<T: DeserializeOwned>(response: Response, target: &str) -> Result<T, ApiError> {
    let response = check(response, target).await?;
    let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(anyhow::Error::new(e).context("Failed to read body")))?;
    serde_json::from_slice(&body).map_err(|e| ApiError::InvalidResponse {
        target: target.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_client_creation() {
        let client = GraphClient::new("test-token");
        assert_eq!(client.access_token(), "test-token");
        assert_eq!(client.base_url(), GRAPH_BASE_URL);
    }

    #[test]
    fn test_set_access_token() {
        let mut client = GraphClient::new("old-token");
        client.set_access_token("new-token");
        assert_eq!(client.access_token(), "new-token");
    }

    #[test]
    fn test_request_builder() {
        let client = GraphClient::new("test-token");
        let request = client.request(Method::GET, "/me").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://graph.microsoft.com/v1.0/me"
        );
        let auth_header = request
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(auth_header, "Bearer test-token");
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let client = GraphClient::with_base_url("token", "http://localhost:8080/");
        let request = client.request(Method::GET, "/me").build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/me");
    }

    #[test]
    fn test_absolute_request_keeps_url() {
        let client = GraphClient::with_base_url("token", "http://localhost:8080");
        let request = client
            .request_url(Method::GET, "http://other:9000/page?$skiptoken=abc")
            .build()
            .unwrap();
        assert_eq!(request.url().host_str(), Some("other"));
        assert!(request.headers().contains_key("authorization"));
    }

    #[test]
    fn test_error_envelope_deserialization() {
        let json = r#"{"error": {"code": "itemNotFound", "message": "The resource could not be found."}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.code, "itemNotFound");
        assert_eq!(envelope.error.message, "The resource could not be found.");
    }
}
