//! Shared test helpers for Graph API integration tests
//!
//! Provides wiremock-based mock server setup and DriveItem JSON builders.
//! Transfer delays are shrunk to milliseconds so retry paths run fast.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use odc_graph::{GraphClient, GraphDrive, TransferOptions};

/// Transfer options with tiny chunks and millisecond waits
pub fn fast_options() -> TransferOptions {
    TransferOptions {
        simple_upload_limit: 8,
        chunk_size: 4,
        upload_max_retries: 3,
        upload_initial_delay: Duration::from_millis(1),
        download_retry: true,
        download_max_retries: 2,
        default_retry_after: Duration::from_millis(1),
        network_retries: 1,
        network_retry_pause: Duration::from_millis(1),
        max_upload_chunks: 50,
    }
}

/// Starts a mock server and returns a drive pointed at it
///
/// Pre-configured endpoints:
/// - GET /me/drive/root → root folder
/// - GET /me → user profile
pub async fn setup_graph_mock() -> (MockServer, GraphDrive) {
    setup_graph_mock_with(fast_options()).await
}

pub async fn setup_graph_mock_with(options: TransferOptions) -> (MockServer, GraphDrive) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(root_json()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "displayName": "Test User",
            "mail": "test@example.com",
            "userPrincipalName": "test@example.com",
            "id": "user-test-001"
        })))
        .mount(&server)
        .await;

    let client = GraphClient::with_base_url("test-access-token", server.uri());
    (server, GraphDrive::with_options(client, options))
}

pub fn root_json() -> Value {
    json!({
        "id": "root-id",
        "name": "root",
        "size": 0,
        "folder": {"childCount": 0},
        "root": {}
    })
}

/// A folder item; `parent` is the normalized parent path ("" for the root)
pub fn folder_json(id: &str, name: &str, parent: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "size": 0,
        "createdDateTime": "2026-01-10T08:00:00Z",
        "lastModifiedDateTime": "2026-01-15T10:00:00Z",
        "parentReference": {"path": format!("/drive/root:{parent}")},
        "folder": {"childCount": 0}
    })
}

/// A file item with an optional QuickXorHash
pub fn file_json(id: &str, name: &str, parent: &str, size: u64, hash: Option<&str>) -> Value {
    let file = match hash {
        Some(hash) => json!({"hashes": {"quickXorHash": hash}}),
        None => json!({}),
    };
    json!({
        "id": id,
        "name": name,
        "size": size,
        "lastModifiedDateTime": "2026-01-15T10:00:00Z",
        "parentReference": {"path": format!("/drive/root:{parent}")},
        "file": file
    })
}

/// A children page without continuation
pub fn page(items: Vec<Value>) -> Value {
    json!({ "value": items })
}

/// Graph error body
pub fn error_json(code: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}
