//! Errors surfaced by use cases

use thiserror::Error;

use crate::domain::TreeError;
use crate::ports::ApiError;

/// Failure of a tree-level operation
#[derive(Debug, Error)]
pub enum OperationError {
    /// A path segment could not be resolved
    #[error("No such file or folder: {0}")]
    PathNotFound(String),

    /// The local tree refused the change
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// The remote call failed
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl OperationError {
    /// Whether the failure means "this does not exist", locally or remotely
    pub fn is_not_found(&self) -> bool {
        match self {
            OperationError::PathNotFound(_) => true,
            OperationError::Api(err) => err.is_not_found(),
            OperationError::Tree(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(OperationError::PathNotFound("/x".into()).is_not_found());
        assert!(!OperationError::Tree(TreeError::RootImmutable("moved")).is_not_found());
        let api = ApiError::Remote {
            target: "/x".into(),
            status: 404,
            code: "itemNotFound".into(),
            message: String::new(),
        };
        assert!(OperationError::from(api).is_not_found());
    }
}
