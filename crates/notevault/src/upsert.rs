//! Note upsert with optimistic concurrency control.
//!
//! A writer declares the version number it believes it is producing. The
//! engine compares that against the stored latest inside one transaction:
//!
//! | declared        | result                                   |
//! |-----------------|------------------------------------------|
//! | `< latest`      | `StaleVersion`, nothing written          |
//! | `== latest`     | idempotent replay, existing id returned  |
//! | `== latest + 1` | new version appended                     |
//! | `> latest + 1`  | `VersionGap` unless gaps are allowed     |
//!
//! The first write for an unused title creates the note, version 1 and the
//! writer's owner row together.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use notevault_core::{
    validate_payload, validate_title, NoteId, NotePayload, NoteVersion, SealedNote, User,
    VersionId,
};
use notevault_perms::{Collaborator, Role};
use notevault_store::{InsertResult, NoteTx, StoreError};

use crate::config::VaultConfig;
use crate::error::{Missing, Result, VaultError};

/// How an upsert was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// A new note was created at version 1.
    Created,
    /// A new version was appended to an existing note.
    Appended,
    /// The declared version was already stored; nothing was written.
    Unchanged,
}

/// Result of a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upserted {
    pub note_id: NoteId,
    pub version_id: VersionId,
    pub version: u64,
    pub outcome: UpsertOutcome,
}

impl Upserted {
    fn from_version(row: &NoteVersion, outcome: UpsertOutcome) -> Self {
        Self {
            note_id: row.note_id,
            version_id: row.id,
            version: row.version,
            outcome,
        }
    }
}

/// Resolve a user by identity, or fail `NotFound(user)`.
pub(crate) fn require_user(tx: &dyn NoteTx, username: &str) -> Result<User> {
    tx.find_user_by_username(username)?
        .ok_or_else(|| VaultError::NotFound(Missing::User(username.to_string())))
}

/// The latest version of a note that is known to exist.
pub(crate) fn require_latest(tx: &dyn NoteTx, note_id: NoteId) -> Result<NoteVersion> {
    tx.find_latest_version(note_id)?.ok_or_else(|| {
        VaultError::Storage(StoreError::InvalidData(format!(
            "{note_id} has no versions"
        )))
    })
}

/// Check a declared version that is ahead of `current`.
pub(crate) fn check_advance(
    note_id: NoteId,
    current: u64,
    declared: u64,
    config: &VaultConfig,
) -> Result<()> {
    if declared <= current {
        return Err(VaultError::StaleVersion {
            note_id,
            current,
            declared,
        });
    }
    if declared > current + 1 && !config.allow_version_gaps {
        return Err(VaultError::VersionGap {
            note_id,
            current,
            declared,
        });
    }
    Ok(())
}

/// Append `version`, turning a (note_id, version) collision into `StaleVersion`.
pub(crate) fn append(
    tx: &mut dyn NoteTx,
    note_id: NoteId,
    version: u64,
    sealed: &SealedNote,
) -> Result<NoteVersion> {
    match tx.append_version(note_id, version, sealed)? {
        InsertResult::Inserted(row) => Ok(row),
        InsertResult::Conflict => {
            let current = require_latest(tx, note_id)?.version;
            warn!(%note_id, version, current, "lost race on version number");
            Err(VaultError::StaleVersion {
                note_id,
                current,
                declared: version,
            })
        }
    }
}

/// Run the upsert protocol inside `tx`.
pub(crate) fn upsert(
    tx: &mut dyn NoteTx,
    config: &VaultConfig,
    identity: &str,
    title: &str,
    payload: &NotePayload,
) -> Result<Upserted> {
    let limits = config.limits();
    validate_title(title, &limits)?;
    validate_payload(payload, &limits)?;

    let user = require_user(tx, identity)?;

    let Some(note) = tx.find_note_by_title(title)? else {
        return create(tx, &user, title, payload);
    };

    let latest = require_latest(tx, note.id)?;
    let roles = tx.roles_for(user.id, note.id)?;
    debug!(note_id = %note.id, latest = latest.version, ?roles, "resolved note");

    if !roles.can_write() {
        warn!(note_id = %note.id, "write without owner or editor role");
        return Err(VaultError::PermissionDenied {
            username: user.username,
            title: note.title,
            action: "write to",
        });
    }

    let declared = payload.version;
    if declared == latest.version {
        if payload.sealed.content_hash() != latest.content_hash {
            warn!(
                note_id = %note.id,
                version = declared,
                stored = %latest.content_hash,
                "replay of stored version carries different content"
            );
            if config.reject_divergent_replays {
                return Err(VaultError::StaleVersion {
                    note_id: note.id,
                    current: latest.version,
                    declared,
                });
            }
        }
        return Ok(Upserted::from_version(&latest, UpsertOutcome::Unchanged));
    }

    check_advance(note.id, latest.version, declared, config)?;
    let row = append(tx, note.id, declared, &payload.sealed)?;
    Ok(Upserted::from_version(&row, UpsertOutcome::Appended))
}

/// First write for a title: note, version 1 and owner row together.
fn create(tx: &mut dyn NoteTx, owner: &User, title: &str, payload: &NotePayload) -> Result<Upserted> {
    if payload.version != 1 {
        return Err(VaultError::InvalidInput(format!(
            "a new note starts at version 1, got {}",
            payload.version
        )));
    }
    let Some(wrapped_key) = payload.wrapped_key.clone() else {
        return Err(VaultError::InvalidInput(
            "a new note needs the owner's wrapped key".into(),
        ));
    };

    let note = tx
        .insert_note(title)?
        .inserted()
        .ok_or_else(|| VaultError::AlreadyExists(format!("note {title:?}")))?;

    let row = append(tx, note.id, 1, &payload.sealed)?;

    let owner_row = Collaborator {
        note_id: note.id,
        user_id: owner.id,
        role: Role::Owner,
        wrapped_key,
    };
    if tx.insert_collaborator(&owner_row)?.is_conflict() {
        return Err(VaultError::AlreadyExists(format!(
            "owner of note {title:?}"
        )));
    }

    debug!(note_id = %note.id, owner = %owner.id, "created note");
    Ok(Upserted::from_version(&row, UpsertOutcome::Created))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VaultConfig {
        VaultConfig::default()
    }

    #[test]
    fn test_check_advance() {
        let note = NoteId(1);
        assert!(check_advance(note, 2, 3, &config()).is_ok());
        assert!(matches!(
            check_advance(note, 2, 2, &config()),
            Err(VaultError::StaleVersion { current: 2, .. })
        ));
        assert!(matches!(
            check_advance(note, 2, 1, &config()),
            Err(VaultError::StaleVersion { .. })
        ));
        assert!(matches!(
            check_advance(note, 2, 5, &config()),
            Err(VaultError::VersionGap { current: 2, declared: 5, .. })
        ));

        let lenient = VaultConfig {
            allow_version_gaps: true,
            ..config()
        };
        assert!(check_advance(note, 2, 5, &lenient).is_ok());
    }

    async fn append_collision<S: notevault_store::Store>(store: S) {
        let (err, versions) = store
            .transact(|tx| {
                let note = tx.insert_note("N")?.inserted().expect("fresh title");
                append(tx, note.id, 1, &SealedNote::new("one", "iv", "tag"))?;
                append(tx, note.id, 2, &SealedNote::new("two", "iv", "tag"))?;

                let err = append(tx, note.id, 2, &SealedNote::new("late", "iv", "tag"))
                    .unwrap_err();
                let versions = tx.list_versions(note.id)?;
                Ok::<_, VaultError>((err, versions))
            })
            .await
            .unwrap();

        assert!(matches!(
            err,
            VaultError::StaleVersion { current: 2, declared: 2, .. }
        ));
        assert_eq!(err.current_version(), Some(2));
        let numbers: Vec<u64> = versions.iter().map(|v| v.version).collect();
        assert_eq!(numbers, [1, 2]);
        assert_eq!(versions[1].sealed, SealedNote::new("two", "iv", "tag"));
    }

    #[tokio::test]
    async fn test_append_collision_is_stale_sqlite() {
        append_collision(notevault_store::SqliteStore::open_memory().unwrap()).await;
    }

    #[tokio::test]
    async fn test_append_collision_is_stale_memory() {
        append_collision(notevault_store::MemoryStore::new()).await;
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&UpsertOutcome::Unchanged).unwrap();
        assert_eq!(json, "\"unchanged\"");
    }
}
