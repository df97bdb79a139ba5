//! Integration tests for streamed downloads

use odc_core::ports::{ContentTransfer, ItemRef};
use odc_graph::{download, TransferError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, error_json};

const CONTENT_PATH: &str = "/me/drive/root:/Docs/a.txt:/content";

async fn mount_content(server: &MockServer, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(CONTENT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .append_header("Content-Type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}

fn item() -> ItemRef {
    ItemRef::Path("/Docs/a.txt".into())
}

#[tokio::test]
async fn test_download_into_directory_uses_remote_name() {
    let (server, drive) = common::setup_graph_mock().await;
    // Larger than the 4-byte write buffer, not a multiple of it
    let content = b"Hello, OneDrive! This is test content.";
    mount_content(&server, content).await;

    let dir = tempfile::tempdir().unwrap();
    let written = drive
        .download(&item(), "a.txt", dir.path())
        .await
        .expect("Download failed");

    assert_eq!(written, dir.path().join("a.txt"));
    assert_eq!(std::fs::read(&written).unwrap(), content);
}

#[tokio::test]
async fn test_download_to_file_path_overwrites() {
    let (server, drive) = common::setup_graph_mock().await;
    mount_content(&server, b"new").await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("copy.txt");
    std::fs::write(&target, b"old content that is longer").unwrap();

    let written = drive.download(&item(), "a.txt", &target).await.unwrap();
    assert_eq!(written, target);
    assert_eq!(std::fs::read(&target).unwrap(), b"new");
}

#[tokio::test]
async fn test_download_empty_file() {
    let (server, drive) = common::setup_graph_mock().await;
    mount_content(&server, &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let written = drive.download(&item(), "a.txt", dir.path()).await.unwrap();
    assert!(std::fs::read(written).unwrap().is_empty());
}

#[tokio::test]
async fn test_throttled_download_waits_and_retries() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path(CONTENT_PATH))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_content(&server, b"payload").await;

    let dir = tempfile::tempdir().unwrap();
    let written = drive.download(&item(), "a.txt", dir.path()).await.unwrap();
    assert_eq!(std::fs::read(written).unwrap(), b"payload");

    let requests = server.received_requests().await.unwrap();
    let content_requests = requests.iter().filter(|r| r.url.path() == CONTENT_PATH).count();
    assert_eq!(content_requests, 2);
}

#[tokio::test]
async fn test_throttling_exhausts_retries() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path(CONTENT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(u64::from(drive.options().download_max_retries) + 1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = download::download_file(drive.client(), drive.options(), &item(), "a.txt", dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::MaxRetriesExceeded { attempts: 2 }));
}

#[tokio::test]
async fn test_other_statuses_fail_without_retry() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path(CONTENT_PATH))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(error_json("itemNotFound", "gone")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = download::download_file(drive.client(), drive.options(), &item(), "a.txt", dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Api(ref e) if e.is_not_found()));
    assert!(!dir.path().join("a.txt").exists());
}

#[tokio::test]
async fn test_throttling_is_fatal_when_retry_disabled() {
    let mut options = common::fast_options();
    options.download_retry = false;
    let (server, drive) = common::setup_graph_mock_with(options).await;

    Mock::given(method("GET"))
        .and(path(CONTENT_PATH))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = download::download_file(drive.client(), drive.options(), &item(), "a.txt", dir.path())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransferError::Api(odc_core::ports::ApiError::Remote { status: 429, .. })
    ));
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    // Nothing listens on port 1; every attempt is refused
    let client = odc_graph::GraphClient::with_base_url("token", "http://127.0.0.1:1");
    let options = common::fast_options();

    let dir = tempfile::tempdir().unwrap();
    let err = download::download_file(&client, &options, &item(), "a.txt", dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Network(_)));
}
