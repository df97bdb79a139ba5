//! Integration tests for listings and path resolution over HTTP
//!
//! Drives the core's `DriveSession` through `GraphDrive` against a
//! wiremock server.

use std::sync::Arc;

use odc_core::ports::{ApiError, DriveApi, ItemRef, ListRequest, ListTarget};
use odc_core::usecases::DriveSession;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, error_json, file_json, folder_json, page};

#[tokio::test]
async fn test_list_request_sends_page_size_and_folder_filter() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root:/Documents:/children"))
        .and(query_param("$top", "25"))
        .and(query_param("$filter", "folder ne null"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![folder_json("f1", "Reports", "/Documents")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let listed = drive
        .list_children(&ListRequest {
            target: ListTarget::Item(ItemRef::Path("/Documents".into())),
            only_folders: true,
            page_size: Some(25),
        })
        .await
        .expect("Listing failed");

    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].name, "Reports");
    assert_eq!(listed.items[0].parent_path.as_deref(), Some("/Documents"));
    assert!(listed.next_link.is_none());
}

#[tokio::test]
async fn test_list_all_follows_next_link() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/children"))
        .and(query_param("$top", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                folder_json("d1", "Docs", ""),
                file_json("f1", "a.txt", "", 3, Some("HA")),
            ],
            "@odata.nextLink": format!("{}/me/drive/root/children?$skiptoken=p2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/children"))
        .and(query_param("$skiptoken", "p2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![file_json("f2", "b.txt", "", 5, None)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = DriveSession::open(Arc::new(drive), Some(2))
        .await
        .expect("Session failed to open");
    let listing = session.list("/", true).await.expect("Listing failed");

    assert!(listing.complete);
    assert_eq!(listing.folders.len(), 1);
    let names: Vec<&str> = listing.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
    assert_eq!(listing.files[0].content_hash.as_deref(), Some("HA"));
}

#[tokio::test]
async fn test_version_segment_path_is_listed_by_id() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![folder_json(
            "A1", "a", "",
        )])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root:/a:/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![folder_json(
            "V1", "v1.0", "/a",
        )])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/V1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![folder_json(
            "B1", "b", "/a/v1.0",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    // The server misroutes this form; it must never be requested
    Mock::given(method("GET"))
        .and(path("/me/drive/root:/a/v1.0:/children"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(error_json("invalidRequest", "misrouted")),
        )
        .expect(0)
        .mount(&server)
        .await;

    let mut session = DriveSession::open(Arc::new(drive), None)
        .await
        .expect("Session failed to open");
    let resolved = session
        .resolve("/a/v1.0/b")
        .await
        .expect("Resolution failed")
        .expect("Path not found");

    assert!(resolved.remainder.is_none());
    let tree = session.tree();
    assert_eq!(tree.path(resolved.folder), "/a/v1.0/b");
    assert_eq!(tree.node(resolved.folder).unwrap().remote_id(), "B1");
}

#[tokio::test]
async fn test_missing_item_is_reported_with_target() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root:/missing.txt:"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(error_json("itemNotFound", "The resource could not be found.")),
        )
        .mount(&server)
        .await;

    let err = drive
        .get_item(&ItemRef::Path("/missing.txt".into()))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.target(), Some("/missing.txt"));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/X1"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(error_json("InvalidAuthenticationToken", "Token expired")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = drive.get_item(&ItemRef::Id("X1".into())).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Token expired"));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/items/X2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = drive.get_item(&ItemRef::Id("X2".into())).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse { ref target, .. } if target == "X2"));
}
