//! Error types for notevault Core.

use thiserror::Error;

/// Structural problems with client-supplied input.
///
/// Raised before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} is {len} bytes, limit is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("version numbers start at 1, got {0}")]
    ZeroVersion(u64),

    #[error("version {0} is out of range")]
    VersionOutOfRange(u64),

    #[error("{field} contains control characters")]
    ControlCharacters { field: &'static str },
}
