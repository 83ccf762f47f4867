//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use notevault_core::{Blob, Note, NoteId, NoteVersion, SealedNote, User, UserId, VersionId};
use notevault_perms::{Collaborator, CollaboratorId, Role, RoleSet};

use crate::error::{Result, StoreError};
use crate::traits::{CollaboratorListing, InsertResult, NoteEntry, NoteTx, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock;
/// transactions are serialized on the write lock.
///
/// Every transaction copies the whole state, so each operation costs time
/// proportional to the store size. Meant for tests, not production data.
pub struct MemoryStore {
    inner: RwLock<MemoryState>,
}

#[derive(Clone, Default)]
struct MemoryState {
    next_user: i64,
    next_note: i64,
    next_version: i64,

    users: BTreeMap<UserId, User>,
    /// Unique index: username -> user.
    usernames: HashMap<String, UserId>,

    notes: BTreeMap<NoteId, Note>,
    /// Unique index: title -> note.
    titles: HashMap<String, NoteId>,

    versions: HashMap<VersionId, NoteVersion>,
    /// Unique index: (note, version number) -> version row.
    positions: BTreeMap<(NoteId, u64), VersionId>,

    collaborators: BTreeMap<(NoteId, UserId), Collaborator>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryState::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn transact<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn NoteTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        // The closure works on a scratch copy; the shared state is only
        // replaced on success.
        let mut tx = MemoryTx {
            state: inner.clone(),
        };
        let out = panic::catch_unwind(AssertUnwindSafe(|| f(&mut tx)))
            .map_err(|_| E::from(StoreError::Task("transaction closure panicked".into())))??;

        *inner = tx.state;
        Ok(out)
    }
}

struct MemoryTx {
    state: MemoryState,
}

impl MemoryTx {
    fn latest(&self, note_id: NoteId) -> Option<&NoteVersion> {
        self.state
            .positions
            .range((note_id, 0)..=(note_id, u64::MAX))
            .next_back()
            .and_then(|(_, id)| self.state.versions.get(id))
    }
}

impl NoteTx for MemoryTx {
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .usernames
            .get(username)
            .and_then(|id| self.state.users.get(id))
            .cloned())
    }

    fn find_note_by_title(&self, title: &str) -> Result<Option<Note>> {
        Ok(self
            .state
            .titles
            .get(title)
            .and_then(|id| self.state.notes.get(id))
            .cloned())
    }

    fn find_latest_version(&self, note_id: NoteId) -> Result<Option<NoteVersion>> {
        Ok(self.latest(note_id).cloned())
    }

    fn find_version(&self, note_id: NoteId, version: u64) -> Result<Option<NoteVersion>> {
        Ok(self
            .state
            .positions
            .get(&(note_id, version))
            .and_then(|id| self.state.versions.get(id))
            .cloned())
    }

    fn list_versions(&self, note_id: NoteId) -> Result<Vec<NoteVersion>> {
        Ok(self
            .state
            .positions
            .range((note_id, 0)..=(note_id, u64::MAX))
            .filter_map(|(_, id)| self.state.versions.get(id))
            .cloned()
            .collect())
    }

    fn find_collaborator(&self, note_id: NoteId, user_id: UserId) -> Result<Option<Collaborator>> {
        Ok(self.state.collaborators.get(&(note_id, user_id)).cloned())
    }

    fn roles_for(&self, user_id: UserId, note_id: NoteId) -> Result<RoleSet> {
        Ok(self
            .state
            .collaborators
            .get(&(note_id, user_id))
            .map(|c| c.role)
            .into_iter()
            .collect())
    }

    fn list_collaborator_roles(&self, user_id: UserId) -> Result<CollaboratorListing> {
        let mut listing = CollaboratorListing::default();

        for collaborator in self
            .state
            .collaborators
            .values()
            .filter(|c| c.user_id == user_id)
        {
            // Same as the inner join in SQL: notes without a version are skipped.
            let (Some(note), Some(latest)) = (
                self.state.notes.get(&collaborator.note_id),
                self.latest(collaborator.note_id),
            ) else {
                continue;
            };

            listing.push(
                collaborator.role,
                NoteEntry {
                    note: note.clone(),
                    latest: latest.clone(),
                    wrapped_key: collaborator.wrapped_key.clone(),
                },
            );
        }

        for group in [&mut listing.owner, &mut listing.editor, &mut listing.viewer] {
            group.sort_by(|a, b| a.note.title.cmp(&b.note.title));
        }
        Ok(listing)
    }

    fn insert_user(&mut self, username: &str, public_key: &Blob) -> Result<InsertResult<User>> {
        if self.state.usernames.contains_key(username) {
            return Ok(InsertResult::Conflict);
        }

        self.state.next_user += 1;
        let user = User {
            id: UserId(self.state.next_user),
            username: username.to_string(),
            public_key: public_key.clone(),
        };
        self.state.usernames.insert(user.username.clone(), user.id);
        self.state.users.insert(user.id, user.clone());

        Ok(InsertResult::Inserted(user))
    }

    fn insert_note(&mut self, title: &str) -> Result<InsertResult<Note>> {
        if self.state.titles.contains_key(title) {
            return Ok(InsertResult::Conflict);
        }

        self.state.next_note += 1;
        let note = Note {
            id: NoteId(self.state.next_note),
            title: title.to_string(),
        };
        self.state.titles.insert(note.title.clone(), note.id);
        self.state.notes.insert(note.id, note.clone());

        Ok(InsertResult::Inserted(note))
    }

    fn append_version(
        &mut self,
        note_id: NoteId,
        version: u64,
        sealed: &SealedNote,
    ) -> Result<InsertResult<NoteVersion>> {
        if !self.state.notes.contains_key(&note_id) {
            return Err(StoreError::InvalidData(format!("{note_id} does not exist")));
        }
        if version == 0 || i64::try_from(version).is_err() {
            return Err(StoreError::InvalidData(format!(
                "version {version} out of range"
            )));
        }
        if self.state.positions.contains_key(&(note_id, version)) {
            return Ok(InsertResult::Conflict);
        }

        self.state.next_version += 1;
        let row = NoteVersion {
            id: VersionId(self.state.next_version),
            note_id,
            version,
            sealed: sealed.clone(),
            content_hash: sealed.content_hash(),
        };
        self.state.positions.insert((note_id, version), row.id);
        self.state.versions.insert(row.id, row.clone());

        Ok(InsertResult::Inserted(row))
    }

    fn insert_collaborator(
        &mut self,
        collaborator: &Collaborator,
    ) -> Result<InsertResult<CollaboratorId>> {
        let key = (collaborator.note_id, collaborator.user_id);
        if !self.state.notes.contains_key(&key.0) || !self.state.users.contains_key(&key.1) {
            return Err(StoreError::InvalidData(format!(
                "collaborator references unknown {} or {}",
                key.0, key.1
            )));
        }
        if self.state.collaborators.contains_key(&key) {
            return Ok(InsertResult::Conflict);
        }
        if collaborator.role == Role::Owner
            && self
                .state
                .collaborators
                .values()
                .any(|c| c.note_id == collaborator.note_id && c.role == Role::Owner)
        {
            return Ok(InsertResult::Conflict);
        }

        self.state.collaborators.insert(key, collaborator.clone());
        Ok(InsertResult::Inserted(collaborator.id()))
    }
}
