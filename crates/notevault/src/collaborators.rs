//! Sharing a note with another user.
//!
//! Sharing always republishes the note: the owner uploads a new version
//! together with the note key wrapped for the new collaborator, and both
//! rows are written in the same transaction.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use notevault_core::{validate_payload, NotePayload, VersionId};
use notevault_perms::{Collaborator, CollaboratorId, Role};
use notevault_store::NoteTx;

use crate::config::VaultConfig;
use crate::error::{Missing, Result, VaultError};
use crate::upsert::{append, check_advance, require_latest, require_user};

/// Result of a successful `add_collaborator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorAdded {
    pub collaborator_id: CollaboratorId,
    pub version_id: VersionId,
    pub version: u64,
}

/// Grant `role` on `title` to `target`, appending `payload` as the next version.
///
/// Checks run in a fixed order and the first failure wins.
pub(crate) fn add_collaborator(
    tx: &mut dyn NoteTx,
    config: &VaultConfig,
    identity: &str,
    target: &str,
    title: &str,
    role: Role,
    payload: &NotePayload,
) -> Result<CollaboratorAdded> {
    validate_payload(payload, &config.limits())?;
    let Some(wrapped_key) = payload.wrapped_key.clone() else {
        return Err(VaultError::InvalidInput(
            "sharing needs the note key wrapped for the collaborator".into(),
        ));
    };

    let target_user = require_user(tx, target)?;
    let requester = require_user(tx, identity)?;

    if requester.id == target_user.id {
        return Err(VaultError::InvalidInput(
            "cannot add yourself as a collaborator".into(),
        ));
    }

    let note = tx
        .find_note_by_title(title)?
        .ok_or_else(|| VaultError::NotFound(Missing::Note(title.to_string())))?;

    if !tx.roles_for(requester.id, note.id)?.can_manage_collaborators() {
        warn!(note_id = %note.id, "sharing attempted by non-owner");
        return Err(VaultError::PermissionDenied {
            username: requester.username,
            title: note.title,
            action: "share",
        });
    }

    let role = role.ensure_grantable()?;

    let existing = tx.roles_for(target_user.id, note.id)?;
    if existing.is_shared_collaborator() {
        debug!(note_id = %note.id, ?existing, "target already collaborates");
        return Err(VaultError::AlreadyCollaborator {
            username: target_user.username,
            title: note.title,
        });
    }

    let latest = require_latest(tx, note.id)?;
    check_advance(note.id, latest.version, payload.version, config)?;

    let row = append(tx, note.id, payload.version, &payload.sealed)?;

    let collaborator = Collaborator {
        note_id: note.id,
        user_id: target_user.id,
        role,
        wrapped_key,
    };
    let Some(collaborator_id) = tx.insert_collaborator(&collaborator)?.inserted() else {
        return Err(VaultError::AlreadyCollaborator {
            username: target_user.username,
            title: note.title,
        });
    };

    Ok(CollaboratorAdded {
        collaborator_id,
        version_id: row.id,
        version: row.version,
    })
}
