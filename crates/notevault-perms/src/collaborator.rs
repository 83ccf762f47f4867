//! Collaborator rows: one role binding of a user to a note.

use serde::{Deserialize, Serialize};

use notevault_core::{Blob, NoteId, UserId};

use crate::role::Role;

/// Composite key of a collaborator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollaboratorId {
    pub note_id: NoteId,
    pub user_id: UserId,
}

/// A user's role on a note, with the note key wrapped for that user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub note_id: NoteId,
    pub user_id: UserId,
    pub role: Role,
    /// The note key encrypted to this user's public key. Opaque.
    pub wrapped_key: Blob,
}

impl Collaborator {
    /// The composite key of this row.
    pub fn id(&self) -> CollaboratorId {
        CollaboratorId {
            note_id: self.note_id,
            user_id: self.user_id,
        }
    }
}
