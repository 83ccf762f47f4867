//! Error types for the permissions module.

use thiserror::Error;

/// Errors that can occur during permission operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermsError {
    /// A role string that is not owner, editor or viewer.
    #[error("unknown role: {0:?}")]
    UnknownRole(String),

    /// A role that cannot be granted through sharing.
    #[error("role {0} cannot be granted to a collaborator")]
    NotGrantable(crate::role::Role),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
