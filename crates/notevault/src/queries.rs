//! Read paths and user registration.

use serde::{Deserialize, Serialize};

use notevault_core::{
    validate_key, validate_username, Blob, Limits, Note, NoteVersion, User,
};
use notevault_perms::{Collaborator, Role, RoleSet};
use notevault_store::{CollaboratorListing, NoteTx};

use crate::error::{Missing, Result, VaultError};
use crate::upsert::{require_latest, require_user};

/// A user's notes grouped by role, each with its latest version and the
/// user's wrapped key.
pub type NoteListing = CollaboratorListing;

/// One version of a note as seen by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteView {
    pub note: Note,
    pub version: NoteVersion,
    pub role: Role,
    /// The note key wrapped for the reader.
    pub wrapped_key: Blob,
}

pub(crate) fn list_notes_for_user(tx: &dyn NoteTx, identity: &str) -> Result<NoteListing> {
    let user = require_user(tx, identity)?;
    Ok(tx.list_collaborator_roles(user.id)?)
}

/// Resolve the caller's collaborator row on `title`, requiring read access.
fn reader(tx: &dyn NoteTx, identity: &str, title: &str) -> Result<(Note, Collaborator)> {
    let user = require_user(tx, identity)?;
    let note = tx
        .find_note_by_title(title)?
        .ok_or_else(|| VaultError::NotFound(Missing::Note(title.to_string())))?;

    match tx.find_collaborator(note.id, user.id)? {
        Some(row) if RoleSet::from_roles([row.role]).can_read() => Ok((note, row)),
        _ => Err(VaultError::PermissionDenied {
            username: user.username,
            title: note.title,
            action: "read",
        }),
    }
}

pub(crate) fn read_note(
    tx: &dyn NoteTx,
    identity: &str,
    title: &str,
    version: Option<u64>,
) -> Result<NoteView> {
    let (note, row) = reader(tx, identity, title)?;

    let version = match version {
        None => require_latest(tx, note.id)?,
        Some(number) => tx.find_version(note.id, number)?.ok_or_else(|| {
            VaultError::NotFound(Missing::Version {
                title: note.title.clone(),
                version: number,
            })
        })?,
    };

    Ok(NoteView {
        note,
        version,
        role: row.role,
        wrapped_key: row.wrapped_key,
    })
}

pub(crate) fn history(tx: &dyn NoteTx, identity: &str, title: &str) -> Result<Vec<NoteVersion>> {
    let (note, _) = reader(tx, identity, title)?;
    Ok(tx.list_versions(note.id)?)
}

pub(crate) fn register_user(
    tx: &mut dyn NoteTx,
    limits: &Limits,
    username: &str,
    public_key: &Blob,
) -> Result<User> {
    validate_username(username, limits)?;
    validate_key("public_key", public_key, limits)?;

    tx.insert_user(username, public_key)?
        .inserted()
        .ok_or_else(|| VaultError::AlreadyExists(format!("user {username:?}")))
}

pub(crate) fn user(tx: &dyn NoteTx, username: &str) -> Result<User> {
    require_user(tx, username)
}
