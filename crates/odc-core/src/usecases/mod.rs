//! Use cases (interactors) for ODC
//!
//! Use cases drive a [`crate::ports::DriveApi`] and merge what it returns
//! into the [`crate::domain::DriveTree`]. They never talk HTTP themselves.
//!
//! ## Use Cases
//!
//! - [`retrieve_children`] - paginated, optionally recursive listing
//! - [`resolve_path`] / [`locate`] - lazy path resolution
//! - [`mutate`] - create, move/rename, delete, upload merge
//! - [`DriveSession`] - path-based operations over one owned tree

pub mod errors;
pub mod mutate;
pub mod resolve_path;
pub mod retrieve_children;
pub mod session;

pub use errors::OperationError;
pub use resolve_path::{find_child, find_child_folder, locate, resolve_path, Resolved, Target};
pub use retrieve_children::{retrieve_all, retrieve_children, retrieve_next_page, RetrieveOptions};
pub use session::{DriveSession, Listing};
