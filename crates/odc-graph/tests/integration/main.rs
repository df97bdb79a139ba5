//! Integration tests for odc-graph
//!
//! Uses wiremock to simulate the Microsoft Graph API and verifies
//! end-to-end behavior of listings, mutations, uploads, and downloads.

mod common;

mod test_download;
mod test_listing;
mod test_mutations;
mod test_upload;
