//! Store traits: the abstract interface for note persistence.
//!
//! The engine never talks to a database directly. It asks a [`Store`] for a
//! transaction and performs all of its reads and writes through the
//! [`NoteTx`] handle it is given.

use async_trait::async_trait;
use notevault_core::{Blob, Note, NoteId, NoteVersion, SealedNote, User, UserId};
use notevault_perms::{Collaborator, CollaboratorId, Role, RoleSet};

use crate::error::{Result, StoreError};

/// Result of an insert that may collide with a uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult<T> {
    /// The row was inserted.
    Inserted(T),
    /// A row with the same unique key already exists. Nothing was written.
    Conflict,
}

impl<T> InsertResult<T> {
    /// The inserted value, if any.
    pub fn inserted(self) -> Option<T> {
        match self {
            InsertResult::Inserted(value) => Some(value),
            InsertResult::Conflict => None,
        }
    }

    /// Whether the insert collided.
    pub fn is_conflict(&self) -> bool {
        matches!(self, InsertResult::Conflict)
    }
}

/// One note as seen by one collaborator: the note, its latest version and
/// the collaborator's wrapped key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub note: Note,
    pub latest: NoteVersion,
    pub wrapped_key: Blob,
}

/// A user's notes grouped by the role they hold.
///
/// Each group is ordered by title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollaboratorListing {
    pub owner: Vec<NoteEntry>,
    pub editor: Vec<NoteEntry>,
    pub viewer: Vec<NoteEntry>,
}

impl CollaboratorListing {
    /// Put an entry in the group for `role`.
    pub fn push(&mut self, role: Role, entry: NoteEntry) {
        match role {
            Role::Owner => self.owner.push(entry),
            Role::Editor => self.editor.push(entry),
            Role::Viewer => self.viewer.push(entry),
        }
    }

    /// Total number of entries across all groups.
    pub fn len(&self) -> usize {
        self.owner.len() + self.editor.len() + self.viewer.len()
    }

    /// Whether the user collaborates on nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Operations available inside one transaction.
///
/// Everything done through a `NoteTx` commits or rolls back together.
/// Uniqueness collisions come back as [`InsertResult::Conflict`] so callers
/// can turn them into domain errors; any other failure is a [`StoreError`].
pub trait NoteTx {
    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Find a user by unique username.
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Find a note by unique title.
    fn find_note_by_title(&self, title: &str) -> Result<Option<Note>>;

    /// The version with the highest version number for a note.
    ///
    /// Computed as a maximum, never inferred from a row count.
    fn find_latest_version(&self, note_id: NoteId) -> Result<Option<NoteVersion>>;

    /// A specific version of a note.
    fn find_version(&self, note_id: NoteId, version: u64) -> Result<Option<NoteVersion>>;

    /// All versions of a note, ordered by version number.
    fn list_versions(&self, note_id: NoteId) -> Result<Vec<NoteVersion>>;

    /// The collaborator row for (note, user), if any.
    fn find_collaborator(&self, note_id: NoteId, user_id: UserId) -> Result<Option<Collaborator>>;

    /// Every role `user_id` holds on `note_id`. Empty if none.
    fn roles_for(&self, user_id: UserId, note_id: NoteId) -> Result<RoleSet>;

    /// Every note `user_id` collaborates on, grouped by role.
    fn list_collaborator_roles(&self, user_id: UserId) -> Result<CollaboratorListing>;

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a user. Conflicts on username.
    fn insert_user(&mut self, username: &str, public_key: &Blob) -> Result<InsertResult<User>>;

    /// Insert a note. Conflicts on title.
    fn insert_note(&mut self, title: &str) -> Result<InsertResult<Note>>;

    /// Append a version. Conflicts on (note_id, version).
    fn append_version(
        &mut self,
        note_id: NoteId,
        version: u64,
        sealed: &SealedNote,
    ) -> Result<InsertResult<NoteVersion>>;

    /// Insert a collaborator row. Conflicts on (note_id, user_id) and on a
    /// second owner for the same note.
    fn insert_collaborator(
        &mut self,
        collaborator: &Collaborator,
    ) -> Result<InsertResult<CollaboratorId>>;
}

/// The Store trait: async access to transactions.
///
/// # Design Notes
///
/// - **Scoped transactions**: [`Store::transact`] commits only when the
///   closure returns `Ok`. Errors, early returns and panics all roll back.
/// - **Blocking work off the runtime**: SQLite runs the closure on the
///   blocking pool; the closure must therefore be `Send + 'static`.
/// - **Serialization**: the store is the only serialization point. Unique
///   constraints on (note_id, version) and title settle write races.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Run `f` inside one transaction.
    async fn transact<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn NoteTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;
}
