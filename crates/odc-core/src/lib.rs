//! ODC Core - Remote object tree and lazy synchronization logic
//!
//! This crate contains the provider-independent core of the OneDrive client:
//! - **Domain** - the arena-backed [`domain::DriveTree`] of folders and files,
//!   the remote-ID cache, path helpers and display records
//! - **Ports** - traits implemented by adapters: [`ports::DriveApi`],
//!   [`ports::ContentTransfer`], [`ports::ContentHasher`]
//! - **Use cases** - paginated children retrieval, lazy path resolution,
//!   mutations that mirror remote changes, and the [`usecases::DriveSession`]
//!   that ties them together
//!
//! # Architecture
//!
//! The tree never talks to the network itself. Use cases drive a port
//! implementation and merge what it returns into the tree, keeping folder
//! aggregates (size, child count) consistent along the whole ancestor chain.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
