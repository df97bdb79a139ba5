//! GraphDrive - port implementations for Microsoft Graph
//!
//! Wraps the [`GraphClient`] and fulfils the core's [`DriveApi`] and
//! [`ContentTransfer`] contracts.
//!
//! ## Design Notes
//!
//! - Every `DriveApi` method is exactly one request; nothing here retries.
//!   Retries exist only in the transfer protocols ([`crate::upload`],
//!   [`crate::download`]).
//! - Folder-only listings are filtered server-side with `folder ne null`.
//! - Continuation links are followed verbatim; they already carry the page
//!   size and filter of the first request.

use std::path::{Path, PathBuf};

use anyhow::Context;
use odc_core::config::Config;
use odc_core::ports::{
    ApiError, ChildrenPage, ContentTransfer, DeleteOutcome, DriveApi, ItemRef, ListRequest,
    ListTarget, RemoteItem, ShareKind, UserInfo,
};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::client::{self, GraphClient};
use crate::download;
use crate::items::{ChildrenResponse, GraphDriveItem};
use crate::paths;
use crate::retry::TransferOptions;
use crate::upload;

/// `$filter` restricting a listing to folders
const FOLDERS_ONLY_FILTER: &str = "folder ne null";

// ============================================================================
// Graph API response types
// ============================================================================

/// Response from the /me endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    display_name: Option<String>,
    user_principal_name: Option<String>,
    mail: Option<String>,
    id: Option<String>,
}

/// Response from `createLink`
#[derive(Debug, Deserialize)]
struct CreateLinkResponse {
    link: SharingLink,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SharingLink {
    web_url: String,
}

// ============================================================================
// GraphDrive
// ============================================================================

/// OneDrive accessed through Microsoft Graph
pub struct GraphDrive {
    client: GraphClient,
    options: TransferOptions,
}

impl GraphDrive {
    /// Creates a drive with default transfer settings
    pub fn new(client: GraphClient) -> Self {
        Self::with_options(client, TransferOptions::default())
    }

    pub fn with_options(client: GraphClient, options: TransferOptions) -> Self {
        Self { client, options }
    }

    /// Creates a drive for the configured endpoint and transfer settings
    pub fn from_config(config: &Config, access_token: impl Into<String>) -> Self {
        let client = GraphClient::with_base_url(access_token, config.graph.base_url.clone());
        Self::with_options(client, TransferOptions::from(&config.transfer))
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    async fn send_item(
        &self,
        request: reqwest::RequestBuilder,
        target: &str,
    ) -> Result<RemoteItem, ApiError> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request for {target}"))?;
        let item: GraphDriveItem = client::json(response, target).await?;
        Ok(item.into())
    }
}

/// Error target naming an item: its path or id
fn target_name(item: &ItemRef) -> String {
    match item {
        ItemRef::Root => "/".to_string(),
        ItemRef::Path(path) => path.clone(),
        ItemRef::Id(id) => id.clone(),
    }
}

#[async_trait::async_trait]
impl DriveApi for GraphDrive {
    async fn list_children(&self, request: &ListRequest) -> Result<ChildrenPage, ApiError> {
        let (builder, target) = match &request.target {
            ListTarget::Continuation(link) => (
                self.client.request_url(Method::GET, link),
                "next page".to_string(),
            ),
            ListTarget::Item(item) => {
                let mut builder = self
                    .client
                    .request(Method::GET, &paths::item_path(item, "children"));
                if let Some(page_size) = request.page_size {
                    builder = builder.query(&[("$top", page_size.to_string())]);
                }
                if request.only_folders {
                    builder = builder.query(&[("$filter", FOLDERS_ONLY_FILTER)]);
                }
                (builder, target_name(item))
            }
        };
        debug!(target = %target, only_folders = request.only_folders, "Listing children");

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to list children of {target}"))?;
        let page: ChildrenResponse = client::json(response, &target).await?;
        Ok(page.into())
    }

    async fn get_item(&self, item: &ItemRef) -> Result<RemoteItem, ApiError> {
        let request = self.client.request(Method::GET, &paths::item_path(item, ""));
        self.send_item(request, &target_name(item)).await
    }

    async fn create_folder(&self, parent: &ItemRef, name: &str) -> Result<RemoteItem, ApiError> {
        let body = serde_json::json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "rename",
        });
        let request = self
            .client
            .request(Method::POST, &paths::item_path(parent, "children"))
            .json(&body);
        self.send_item(request, &target_name(parent)).await
    }

    async fn move_item(
        &self,
        item: &ItemRef,
        new_parent_id: &str,
        new_name: &str,
    ) -> Result<RemoteItem, ApiError> {
        let body = serde_json::json!({
            "parentReference": { "id": new_parent_id },
            "name": new_name,
        });
        let request = self
            .client
            .request(Method::PATCH, &paths::item_path(item, ""))
            .json(&body);
        self.send_item(request, &target_name(item)).await
    }

    async fn delete_item(&self, item: &ItemRef) -> Result<DeleteOutcome, ApiError> {
        let target = target_name(item);
        let response = self
            .client
            .request(Method::DELETE, &paths::item_path(item, ""))
            .send()
            .await
            .with_context(|| format!("Failed to delete {target}"))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            StatusCode::UNAUTHORIZED => client::check(response, &target)
                .await
                .map(|_| DeleteOutcome::Unexpected(401)),
            status => Ok(DeleteOutcome::Unexpected(status.as_u16())),
        }
    }

    async fn create_share_link(&self, item: &ItemRef, kind: ShareKind) -> Result<String, ApiError> {
        let target = target_name(item);
        let body = serde_json::json!({ "type": kind.as_str(), "scope": "anonymous" });
        let response = self
            .client
            .request(Method::POST, &paths::item_path(item, "createLink"))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to create a link for {target}"))?;
        let created: CreateLinkResponse = client::json(response, &target).await?;
        Ok(created.link.web_url)
    }

    async fn user_info(&self) -> Result<UserInfo, ApiError> {
        let response = self
            .client
            .request(Method::GET, "/me")
            .send()
            .await
            .context("Failed to fetch /me")?;
        let me: MeResponse = client::json(response, "me").await?;

        Ok(UserInfo {
            display_name: me.display_name.unwrap_or_else(|| "Unknown User".to_string()),
            principal_name: me.user_principal_name.or(me.mail).unwrap_or_default(),
            id: me.id.unwrap_or_default(),
        })
    }
}

#[async_trait::async_trait]
impl ContentTransfer for GraphDrive {
    async fn download(&self, item: &ItemRef, name: &str, dest: &Path) -> anyhow::Result<PathBuf> {
        download::download_file(&self.client, &self.options, item, name, dest)
            .await
            .with_context(|| format!("Failed to download {name}"))
    }

    async fn upload(
        &self,
        source: &Path,
        parent: &ItemRef,
        name: &str,
    ) -> anyhow::Result<RemoteItem> {
        upload::upload_file(&self.client, &self.options, source, parent, name)
            .await
            .with_context(|| format!("Failed to upload {}", source.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_me_response_partial_fields() {
        let json = r#"{"id": "user-123"}"#;
        let me: MeResponse = serde_json::from_str(json).unwrap();
        assert!(me.display_name.is_none());
        assert!(me.user_principal_name.is_none());
        assert_eq!(me.id.unwrap(), "user-123");
    }

    #[test]
    fn test_create_link_response() {
        let json = r#"{
            "id": "perm-1",
            "roles": ["write"],
            "link": {"type": "edit", "scope": "anonymous", "webUrl": "https://1drv.ms/x/abc"}
        }"#;
        let created: CreateLinkResponse = serde_json::from_str(json).unwrap();
        assert_eq!(created.link.web_url, "https://1drv.ms/x/abc");
    }

    #[test]
    fn test_from_config_uses_configured_endpoint() {
        let config = odc_core::config::ConfigBuilder::new()
            .graph_base_url("http://localhost:9999")
            .chunk_size_mb(10)
            .build();
        let drive = GraphDrive::from_config(&config, "token");
        assert_eq!(drive.client().base_url(), "http://localhost:9999");
        assert_eq!(drive.options().chunk_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_target_names() {
        assert_eq!(target_name(&ItemRef::Root), "/");
        assert_eq!(target_name(&ItemRef::Path("/a".into())), "/a");
        assert_eq!(target_name(&ItemRef::Id("X1".into())), "X1");
    }
}
