//! Integration tests for folder creation, moves, deletes and sharing

use std::sync::Arc;

use odc_core::ports::{DeleteOutcome, DriveApi, ItemRef, ShareKind};
use odc_core::usecases::DriveSession;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, file_json, folder_json, page};

#[tokio::test]
async fn test_mkdir_uses_server_chosen_name() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/me/drive/root/children"))
        .and(body_partial_json(serde_json::json!({
            "name": "New",
            "@microsoft.graph.conflictBehavior": "rename"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(folder_json("n1", "New 1", "")))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = DriveSession::open(Arc::new(drive), None).await.unwrap();
    let record = session.mkdir("/New").await.expect("mkdir failed");

    assert_eq!(record.name, "New 1");
    assert_eq!(record.path, "/New 1");
    assert_eq!(record.size, 0);
}

#[tokio::test]
async fn test_move_patches_parent_and_name() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            folder_json("folder-B", "B", ""),
            file_json("file-A", "a.txt", "", 7, None),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root:/B:/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/me/drive/root:/a.txt:"))
        .and(body_partial_json(serde_json::json!({
            "parentReference": {"id": "folder-B"},
            "name": "b.txt"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(file_json("file-A", "b.txt", "/B", 7, None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = DriveSession::open(Arc::new(drive), None).await.unwrap();
    let record = session.mv("/a.txt", "/B/b.txt").await.expect("move failed");

    assert_eq!(record.path, "/B/b.txt");
    let tree = session.tree();
    let b = tree.child_folder(tree.root(), "B").unwrap();
    assert_eq!(tree.node(b).unwrap().size(), 7);
    assert!(tree.child(tree.root(), "a.txt").is_none());
}

#[tokio::test]
async fn test_delete_outcomes() {
    let (server, drive) = common::setup_graph_mock().await;

    for (name, status) in [("gone.txt", 204), ("never.txt", 404), ("locked.txt", 423)] {
        Mock::given(method("DELETE"))
            .and(path(format!("/me/drive/root:/{name}:")))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;
    }

    let delete = |name: &str| ItemRef::Path(format!("/{name}"));
    assert_eq!(
        drive.delete_item(&delete("gone.txt")).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        drive.delete_item(&delete("never.txt")).await.unwrap(),
        DeleteOutcome::NotFound
    );
    assert_eq!(
        drive.delete_item(&delete("locked.txt")).await.unwrap(),
        DeleteOutcome::Unexpected(423)
    );
}

#[tokio::test]
async fn test_create_share_link() {
    let (server, drive) = common::setup_graph_mock().await;

    Mock::given(method("POST"))
        .and(path("/me/drive/root:/Docs/a.txt:/createLink"))
        .and(body_partial_json(serde_json::json!({"type": "edit", "scope": "anonymous"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "perm-1",
            "link": {"type": "edit", "scope": "anonymous", "webUrl": "https://1drv.ms/t/s!abc"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = drive
        .create_share_link(&ItemRef::Path("/Docs/a.txt".into()), ShareKind::Edit)
        .await
        .expect("createLink failed");
    assert_eq!(url, "https://1drv.ms/t/s!abc");
}

#[tokio::test]
async fn test_user_info() {
    let (_server, drive) = common::setup_graph_mock().await;

    let user = drive.user_info().await.expect("GET /me failed");
    assert_eq!(user.display_name, "Test User");
    assert_eq!(user.principal_name, "test@example.com");
    assert_eq!(user.id, "user-test-001");
}
