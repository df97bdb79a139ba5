//! Integration tests for the upload protocols
//!
//! Files at or above the simple-upload limit (8 bytes in these tests) go
//! through an upload session in 4-byte chunks.

use odc_core::ports::{ItemRef, RemoteObject};
use odc_graph::{upload, TransferError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, file_json};

const CONTENT: &[u8] = b"abcdefghij";

fn write_source(dir: &tempfile::TempDir, content: &[u8]) -> std::path::PathBuf {
    let source = dir.path().join("big.bin");
    std::fs::write(&source, content).unwrap();
    source
}

/// Mounts `createUploadSession` for /Documents/big.bin and returns the session URL
async fn mount_session(server: &MockServer) -> String {
    let upload_url = format!("{}/upload/session-1", server.uri());
    Mock::given(method("POST"))
        .and(path("/me/drive/root:/Documents/big.bin:/createUploadSession"))
        .and(body_partial_json(serde_json::json!({
            "item": {"@microsoft.graph.conflictBehavior": "replace"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uploadUrl": upload_url,
            "expirationDateTime": "2026-01-29T09:21:55.523Z"
        })))
        .expect(1)
        .mount(server)
        .await;
    upload_url
}

async fn mount_cancel(server: &MockServer, times: u64) {
    Mock::given(method("DELETE"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(times)
        .mount(server)
        .await;
}

async fn chunk_ranges(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "PUT" && r.url.path() == "/upload/session-1")
        .map(|r| {
            r.headers
                .get("content-range")
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_upload_small_file_single_put() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("PUT"))
        .and(path("/me/drive/root:/Documents/small.txt:/content"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_json(
            "up-1",
            "small.txt",
            "/Documents",
            5,
            Some("HASH"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("small.txt");
    std::fs::write(&source, b"12345").unwrap();

    let item = upload::upload_file(
        drive.client(),
        drive.options(),
        &source,
        &ItemRef::Path("/Documents".into()),
        "small.txt",
    )
    .await
    .expect("Small upload failed");

    assert_eq!(item.id, "up-1");
    assert_eq!(item.size, 5);
    assert!(matches!(
        item.object,
        RemoteObject::File { ref content_hash, .. } if content_hash.as_deref() == Some("HASH")
    ));

    let received = server.received_requests().await.unwrap();
    let put = received.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    assert_eq!(put.body, b"12345");
}

#[tokio::test]
async fn test_session_upload_sends_sequential_ranges() {
    let (server, drive) = common::setup_graph_mock().await;
    mount_session(&server).await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("Content-Range", "bytes 8-9/10"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_json(
            "big-1",
            "big.bin",
            "/Documents",
            10,
            None,
        )))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    mount_cancel(&server, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, CONTENT);
    let item = upload::upload_file(
        drive.client(),
        drive.options(),
        &source,
        &ItemRef::Path("/Documents".into()),
        "big.bin",
    )
    .await
    .expect("Session upload failed");

    assert_eq!(item.id, "big-1");
    assert_eq!(
        chunk_ranges(&server).await,
        vec!["bytes 0-3/10", "bytes 4-7/10", "bytes 8-9/10"]
    );

    // Session URLs are pre-authenticated
    let received = server.received_requests().await.unwrap();
    assert!(received
        .iter()
        .filter(|r| r.url.path() == "/upload/session-1")
        .all(|r| r.headers.get("authorization").is_none()));
}

#[tokio::test]
async fn test_session_upload_resumes_after_server_error() {
    let (server, drive) = common::setup_graph_mock().await;
    let upload_url = mount_session(&server).await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("Content-Range", "bytes 4-7/10"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("Content-Range", "bytes 8-9/10"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_json(
            "big-1",
            "big.bin",
            "/Documents",
            10,
            None,
        )))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uploadUrl": upload_url,
            "nextExpectedRanges": ["4-"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_cancel(&server, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, CONTENT);
    let item = upload::upload_file(
        drive.client(),
        drive.options(),
        &source,
        &ItemRef::Path("/Documents".into()),
        "big.bin",
    )
    .await
    .expect("Upload did not recover from 503");
    assert_eq!(item.size, 10);

    let ranges = chunk_ranges(&server).await;
    assert_eq!(
        ranges,
        vec!["bytes 0-3/10", "bytes 4-7/10", "bytes 4-7/10", "bytes 8-9/10"]
    );

    // Bodies of the accepted chunks rebuild the file exactly once
    let received = server.received_requests().await.unwrap();
    let puts: Vec<_> = received
        .iter()
        .filter(|r| r.method.as_str() == "PUT" && r.url.path() == "/upload/session-1")
        .collect();
    let mut accepted = Vec::new();
    for (index, request) in puts.iter().enumerate() {
        if index != 1 {
            accepted.extend_from_slice(&request.body);
        }
    }
    assert_eq!(accepted, CONTENT);
}

#[tokio::test]
async fn test_session_upload_gives_up_after_max_retries() {
    let (server, drive) = common::setup_graph_mock().await;
    mount_session(&server).await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/upload/session-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"nextExpectedRanges": ["0-"]})),
        )
        .mount(&server)
        .await;
    mount_cancel(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, CONTENT);
    let err = upload::upload_file(
        drive.client(),
        drive.options(),
        &source,
        &ItemRef::Path("/Documents".into()),
        "big.bin",
    )
    .await
    .unwrap_err();

    let max_retries = drive.options().upload_max_retries;
    assert!(matches!(err, TransferError::MaxRetriesExceeded { attempts } if attempts == max_retries));
    assert_eq!(chunk_ranges(&server).await.len() as u32, max_retries + 1);
}

#[tokio::test]
async fn test_expired_session_is_fatal() {
    let (server, drive) = common::setup_graph_mock().await;
    mount_session(&server).await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, CONTENT);
    let err = upload::upload_file(
        drive.client(),
        drive.options(),
        &source,
        &ItemRef::Path("/Documents".into()),
        "big.bin",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, TransferError::SessionExpired));
}

#[tokio::test]
async fn test_unexpected_chunk_status_is_fatal() {
    let (server, drive) = common::setup_graph_mock().await;
    mount_session(&server).await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(416))
        .expect(1)
        .mount(&server)
        .await;
    mount_cancel(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, CONTENT);
    let err = upload::upload_file(
        drive.client(),
        drive.options(),
        &source,
        &ItemRef::Path("/Documents".into()),
        "big.bin",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        TransferError::UnexpectedStatus { status: 416, .. }
    ));
}

#[tokio::test]
async fn test_chunk_limit_reports_incomplete() {
    let mut options = common::fast_options();
    options.max_upload_chunks = 2;
    let (server, drive) = common::setup_graph_mock_with(options).await;
    mount_session(&server).await;

    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&server)
        .await;
    mount_cancel(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, CONTENT);
    let err = upload::upload_file(
        drive.client(),
        drive.options(),
        &source,
        &ItemRef::Path("/Documents".into()),
        "big.bin",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        TransferError::Incomplete {
            stop_reason: upload::StopReason::LoopLimit,
            uploaded: 8,
            total: 10,
        }
    ));
}
