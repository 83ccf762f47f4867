//! Error types for the Vault.

use std::fmt;

use notevault_core::{NoteId, ValidationError};
use notevault_perms::PermsError;
use notevault_store::StoreError;
use thiserror::Error;

/// What a `NotFound` error failed to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    /// No user with this username.
    User(String),
    /// No note with this title.
    Note(String),
    /// The note exists but has no such version number.
    Version { title: String, version: u64 },
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::User(username) => write!(f, "user {username:?}"),
            Missing::Note(title) => write!(f, "note {title:?}"),
            Missing::Version { title, version } => write!(f, "version {version} of note {title:?}"),
        }
    }
}

/// Flat error classification for transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    StaleVersion,
    VersionGap,
    InvalidInput,
    AlreadyExists,
    AlreadyCollaborator,
    StorageFailure,
}

/// Errors that can occur during Vault operations.
///
/// Every error aborts the surrounding transaction; nothing is partially
/// written.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("not found: {0}")]
    NotFound(Missing),

    /// The requester lacks the capability for this action.
    #[error("{username:?} may not {action} note {title:?}")]
    PermissionDenied {
        username: String,
        title: String,
        action: &'static str,
    },

    /// The declared version trails the stored latest. Refetch and retry.
    #[error("stale write to {note_id}: stored version is {current}, declared {declared}")]
    StaleVersion {
        note_id: NoteId,
        current: u64,
        declared: u64,
    },

    /// The declared version skips ahead of `current + 1`.
    #[error("version gap on {note_id}: stored version is {current}, declared {declared}")]
    VersionGap {
        note_id: NoteId,
        current: u64,
        declared: u64,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The target already holds a role on the note.
    #[error("{username:?} already collaborates on note {title:?}")]
    AlreadyCollaborator { username: String, title: String },

    /// Storage failure, surfaced unmodified.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl VaultError {
    /// Flat classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::NotFound(_) => ErrorKind::NotFound,
            VaultError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            VaultError::StaleVersion { .. } => ErrorKind::StaleVersion,
            VaultError::VersionGap { .. } => ErrorKind::VersionGap,
            VaultError::InvalidInput(_) => ErrorKind::InvalidInput,
            VaultError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            VaultError::AlreadyCollaborator { .. } => ErrorKind::AlreadyCollaborator,
            VaultError::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// The stored latest version, for errors a client can retry after refetching.
    pub fn current_version(&self) -> Option<u64> {
        match self {
            VaultError::StaleVersion { current, .. } | VaultError::VersionGap { current, .. } => {
                Some(*current)
            }
            _ => None,
        }
    }

    /// The note the error concerns, when known.
    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            VaultError::StaleVersion { note_id, .. } | VaultError::VersionGap { note_id, .. } => {
                Some(*note_id)
            }
            _ => None,
        }
    }
}

impl From<ValidationError> for VaultError {
    fn from(err: ValidationError) -> Self {
        VaultError::InvalidInput(err.to_string())
    }
}

impl From<PermsError> for VaultError {
    fn from(err: PermsError) -> Self {
        VaultError::InvalidInput(err.to_string())
    }
}

/// Result type for Vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;
    use notevault_perms::Role;

    #[test]
    fn test_kind_and_current_version() {
        let err = VaultError::StaleVersion {
            note_id: NoteId(4),
            current: 2,
            declared: 1,
        };
        assert_eq!(err.kind(), ErrorKind::StaleVersion);
        assert_eq!(err.current_version(), Some(2));
        assert_eq!(err.note_id(), Some(NoteId(4)));

        let err = VaultError::NotFound(Missing::Note("a".into()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.current_version(), None);
    }

    #[test]
    fn test_conversions_are_invalid_input() {
        let err: VaultError = ValidationError::ZeroVersion(0).into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err: VaultError = PermsError::NotGrantable(Role::Owner).into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err: VaultError = StoreError::InvalidData("x".into()).into();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
    }

    #[test]
    fn test_display() {
        let err = VaultError::NotFound(Missing::Version {
            title: "A".into(),
            version: 9,
        });
        assert_eq!(err.to_string(), "not found: version 9 of note \"A\"");
    }
}
