//! Port definitions for adapters
//!
//! - [`DriveApi`] - metadata operations against the remote drive
//! - [`ContentTransfer`] - file upload/download
//! - [`ContentHasher`] - local content hashing

pub mod content;
pub mod drive_api;

pub use content::{ContentHasher, ContentTransfer};
pub use drive_api::{
    ApiError, ChildrenPage, DeleteOutcome, DriveApi, ItemRef, ListRequest, ListTarget,
    RemoteItem, RemoteObject, ShareKind, UserInfo,
};
