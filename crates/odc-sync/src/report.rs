//! Outcome of a bulk transfer

use serde::Serialize;

/// An item that could not be transferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub path: String,
    pub error: String,
}

/// Per-item results of one bulk transfer
///
/// Paths are the source paths (remote for downloads, local for uploads).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub transferred: Vec<String>,
    /// Destination already held identical content
    pub unchanged: Vec<String>,
    /// Excluded, unsupported or conflicting items
    pub skipped: Vec<String>,
    pub failed: Vec<FailedItem>,
    pub warnings: Vec<String>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail(&mut self, path: impl Into<String>, error: impl std::fmt::Display) {
        self.failed.push(FailedItem {
            path: path.into(),
            error: format!("{error:#}"),
        });
    }

    pub(crate) fn skip(&mut self, path: impl Into<String>, warning: Option<String>) {
        self.skipped.push(path.into());
        if let Some(warning) = warning {
            self.warnings.push(warning);
        }
    }

    /// Whether every item either transferred, was unchanged or was skipped
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary, e.g. `3 transferred, 1 unchanged, 0 skipped, 0 failed`
    pub fn summary(&self) -> String {
        format!(
            "{} transferred, {} unchanged, {} skipped, {} failed",
            self.transferred.len(),
            self.unchanged.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}
