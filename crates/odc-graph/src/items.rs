//! DriveItem responses
//!
//! Maps the JSON returned by the Graph API into the port-level
//! [`RemoteItem`] DTO. The folder/file decision is made here, once, from the
//! presence of the `folder` facet.

use chrono::{DateTime, Utc};
use odc_core::ports::{ChildrenPage, RemoteItem, RemoteObject};
use percent_encoding::percent_decode_str;
use serde::Deserialize;

// ============================================================================
// Graph API DriveItem response types for deserialization
// ============================================================================

/// Represents a DriveItem response from the Microsoft Graph API
///
/// Fields use `Option` because not all fields are present in every response
/// (the root has no parent reference, folders have no hashes).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDriveItem {
    /// OneDrive item ID
    pub id: String,
    /// Item name (file or folder name)
    pub name: String,
    /// Size in bytes; for folders, the size of all descendants
    pub size: Option<u64>,
    /// Creation timestamp in ISO 8601 format
    created_date_time: Option<String>,
    /// Last modified timestamp in ISO 8601 format
    last_modified_date_time: Option<String>,
    /// Reference to the parent folder
    parent_reference: Option<ParentReference>,
    /// Present if the item is a file (contains hashes)
    file: Option<FileInfo>,
    /// Present if the item is a folder
    folder: Option<FolderInfo>,
    /// Present only on the drive root
    root: Option<serde_json::Value>,
}

/// Parent folder reference in a DriveItem response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParentReference {
    /// Full path of the parent folder (e.g., "/drive/root:/Documents")
    path: Option<String>,
    /// Parent folder item ID
    id: Option<String>,
}

/// File-specific metadata in a DriveItem response
#[derive(Debug, Deserialize)]
struct FileInfo {
    hashes: Option<FileHashes>,
}

/// Content hashes for a file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileHashes {
    /// QuickXorHash used by OneDrive for integrity verification
    quick_xor_hash: Option<String>,
    /// SHA-1, not reported for every account type
    sha1_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderInfo {
    child_count: Option<u64>,
}

/// One page of `GET .../children`
#[derive(Debug, Deserialize)]
pub struct ChildrenResponse {
    pub value: Vec<GraphDriveItem>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

impl From<ChildrenResponse> for ChildrenPage {
    fn from(response: ChildrenResponse) -> Self {
        ChildrenPage {
            items: response.value.into_iter().map(RemoteItem::from).collect(),
            next_link: response.next_link,
        }
    }
}

// ============================================================================
// GraphDriveItem -> RemoteItem conversion
// ============================================================================

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    // Both "2026-01-15T10:00:00Z" and "2026-01-15T10:00:00.123Z" occur
    value.and_then(|s| s.parse::<DateTime<Utc>>().ok())
}

/// Normalize a parent reference path
///
/// `/drive/root:` becomes `""`, `/drive/root:/Documents` becomes
/// `/Documents`; the remainder is percent-decoded. Drive-qualified forms
/// (`/drives/{id}/root:`) are handled the same way.
pub fn normalize_parent_path(raw: &str) -> String {
    let stripped = match raw.find("root:") {
        Some(index) => &raw[index + "root:".len()..],
        None => raw,
    };
    let decoded = percent_decode_str(stripped).decode_utf8_lossy();
    decoded.trim_end_matches('/').to_string()
}

impl From<GraphDriveItem> for RemoteItem {
    fn from(item: GraphDriveItem) -> Self {
        let object = match (&item.folder, &item.file) {
            (Some(folder), _) => RemoteObject::Folder {
                child_count: folder.child_count.unwrap_or(0),
            },
            (None, file) => {
                let hashes = file.as_ref().and_then(|f| f.hashes.as_ref());
                RemoteObject::File {
                    content_hash: hashes.and_then(|h| h.quick_xor_hash.clone()),
                    sha1_hash: hashes.and_then(|h| h.sha1_hash.clone()),
                    downloadable: file.is_some(),
                }
            }
        };

        let parent_path = item
            .parent_reference
            .as_ref()
            .and_then(|pr| pr.path.as_deref())
            .map(normalize_parent_path);
        let parent_id = item.parent_reference.as_ref().and_then(|pr| pr.id.clone());

        RemoteItem {
            created_at: parse_timestamp(item.created_date_time.as_deref()),
            modified_at: parse_timestamp(item.last_modified_date_time.as_deref()),
            size: item.size.unwrap_or(0),
            is_root: item.root.is_some(),
            id: item.id,
            name: item.name,
            parent_path,
            parent_id,
            object,
        }
    }
}
