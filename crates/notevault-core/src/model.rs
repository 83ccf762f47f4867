//! Records of the notevault data model.

use serde::{Deserialize, Serialize};

use crate::types::{Blob, ContentHash, NoteId, UserId, VersionId};

/// A registered user.
///
/// The public key is only used by clients to wrap note keys for this user;
/// the server treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub public_key: Blob,
}

/// A logical document. Content lives in its [`NoteVersion`] history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
}

/// The encrypted body of a note exactly as the client sealed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedNote {
    /// AEAD ciphertext.
    pub ciphertext: Blob,
    /// Nonce / initialization vector used for sealing.
    pub iv: Blob,
    /// Authentication tag.
    pub tag: Blob,
}

impl SealedNote {
    /// Create a sealed note from its three parts.
    pub fn new(ciphertext: impl Into<Blob>, iv: impl Into<Blob>, tag: impl Into<Blob>) -> Self {
        Self {
            ciphertext: ciphertext.into(),
            iv: iv.into(),
            tag: tag.into(),
        }
    }

    /// BLAKE3 fingerprint over the three parts.
    ///
    /// Each part is length-prefixed so that moving bytes between fields
    /// changes the hash.
    pub fn content_hash(&self) -> ContentHash {
        let mut hasher = blake3::Hasher::new_derive_key("notevault-v1 sealed-note");
        for part in [&self.ciphertext, &self.iv, &self.tag] {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        ContentHash(*hasher.finalize().as_bytes())
    }
}

/// An incoming note write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePayload {
    /// The sealed content.
    pub sealed: SealedNote,

    /// The note key wrapped for the recipient of this write.
    ///
    /// Required when the write creates the note (owner's key) and when
    /// it accompanies a new collaborator (collaborator's key).
    pub wrapped_key: Option<Blob>,

    /// The version number the client believes it is writing.
    pub version: u64,
}

impl NotePayload {
    /// Create a payload without a wrapped key.
    pub fn new(sealed: SealedNote, version: u64) -> Self {
        Self {
            sealed,
            wrapped_key: None,
            version,
        }
    }

    /// Attach a wrapped note key.
    pub fn with_wrapped_key(mut self, key: impl Into<Blob>) -> Self {
        self.wrapped_key = Some(key.into());
        self
    }
}

/// One stored snapshot of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteVersion {
    pub id: VersionId,
    pub note_id: NoteId,
    /// Per-note version number, starting at 1.
    pub version: u64,
    pub sealed: SealedNote,
    pub content_hash: ContentHash,
}
