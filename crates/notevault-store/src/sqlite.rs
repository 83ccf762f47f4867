//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for notevault. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use notevault_core::{
    Blob, ContentHash, Note, NoteId, NoteVersion, SealedNote, User, UserId, VersionId,
};
use notevault_perms::{Collaborator, CollaboratorId, Role, RoleSet};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{CollaboratorListing, InsertResult, NoteEntry, NoteTx, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. Each transaction holds the connection for
/// its whole duration and runs on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

// A panic inside a transaction closure poisons the mutex, but the
// transaction was already rolled back while unwinding.
fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Store for SqliteStore {
    async fn transact<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn NoteTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || -> std::result::Result<T, E> {
            let mut guard = lock(&conn);
            // IMMEDIATE takes the write lock up front so another process
            // cannot slip a version in between our read and our insert.
            let tx = guard
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(StoreError::from)?;

            let out = f(&mut SqliteTx { conn: &tx })?;

            tx.commit().map_err(StoreError::from)?;
            Ok(out)
        })
        .await
        .map_err(|e| E::from(StoreError::Task(e.to_string())))?
    }
}

/// A live SQLite transaction.
///
/// Dropping the underlying `rusqlite::Transaction` without committing rolls
/// it back.
struct SqliteTx<'a> {
    conn: &'a Connection,
}

const VERSION_COLUMNS: &str = "id, note_id, version, ciphertext, iv, tag, content_hash";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get("id")?),
        username: row.get("username")?,
        public_key: Blob::from(row.get::<_, Vec<u8>>("public_key")?),
    })
}

fn row_to_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteVersion> {
    let hash_idx = row.as_ref().column_index("content_hash")?;
    let hash_bytes: Vec<u8> = row.get(hash_idx)?;
    let content_hash = ContentHash::try_from(hash_bytes.as_slice()).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(hash_idx, rusqlite::types::Type::Blob, Box::new(e))
    })?;

    Ok(NoteVersion {
        id: VersionId(row.get("id")?),
        note_id: NoteId(row.get("note_id")?),
        version: row.get::<_, i64>("version")? as u64,
        sealed: SealedNote {
            ciphertext: Blob::from(row.get::<_, Vec<u8>>("ciphertext")?),
            iv: Blob::from(row.get::<_, Vec<u8>>("iv")?),
            tag: Blob::from(row.get::<_, Vec<u8>>("tag")?),
        },
        content_hash,
    })
}

fn parse_role(idx: usize, text: String) -> rusqlite::Result<Role> {
    text.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map a uniqueness violation to `Conflict`, pass everything else through.
fn unique_or<T>(result: rusqlite::Result<T>) -> Result<InsertResult<T>> {
    match result {
        Ok(value) => Ok(InsertResult::Inserted(value)),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Ok(InsertResult::Conflict)
        }
        Err(e) => Err(e.into()),
    }
}

impl NoteTx for SqliteTx<'_> {
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, public_key FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
    }

    fn find_note_by_title(&self, title: &str) -> Result<Option<Note>> {
        self.conn
            .query_row(
                "SELECT id, title FROM notes WHERE title = ?1",
                params![title],
                |row| {
                    Ok(Note {
                        id: NoteId(row.get(0)?),
                        title: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
    }

    fn find_latest_version(&self, note_id: NoteId) -> Result<Option<NoteVersion>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM note_versions
                     WHERE note_id = ?1
                       AND version = (SELECT MAX(version) FROM note_versions WHERE note_id = ?1)"
                ),
                params![note_id.0],
                row_to_version,
            )
            .optional()
            .map_err(StoreError::from)
    }

    fn find_version(&self, note_id: NoteId, version: u64) -> Result<Option<NoteVersion>> {
        let Ok(version) = i64::try_from(version) else {
            return Ok(None);
        };
        self.conn
            .query_row(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM note_versions WHERE note_id = ?1 AND version = ?2"
                ),
                params![note_id.0, version],
                row_to_version,
            )
            .optional()
            .map_err(StoreError::from)
    }

    fn list_versions(&self, note_id: NoteId) -> Result<Vec<NoteVersion>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM note_versions WHERE note_id = ?1 ORDER BY version"
        ))?;

        let versions = stmt
            .query_map(params![note_id.0], row_to_version)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(versions)
    }

    fn find_collaborator(&self, note_id: NoteId, user_id: UserId) -> Result<Option<Collaborator>> {
        self.conn
            .query_row(
                "SELECT role, wrapped_key FROM collaborators WHERE note_id = ?1 AND user_id = ?2",
                params![note_id.0, user_id.0],
                |row| {
                    Ok(Collaborator {
                        note_id,
                        user_id,
                        role: parse_role(0, row.get(0)?)?,
                        wrapped_key: Blob::from(row.get::<_, Vec<u8>>(1)?),
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
    }

    fn roles_for(&self, user_id: UserId, note_id: NoteId) -> Result<RoleSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT role FROM collaborators WHERE note_id = ?1 AND user_id = ?2")?;

        let roles = stmt
            .query_map(params![note_id.0, user_id.0], |row| parse_role(0, row.get(0)?))?
            .collect::<rusqlite::Result<RoleSet>>()?;

        Ok(roles)
    }

    fn list_collaborator_roles(&self, user_id: UserId) -> Result<CollaboratorListing> {
        let mut stmt = self.conn.prepare(
            "SELECT c.role, c.wrapped_key, n.title,
                    v.id, v.note_id, v.version, v.ciphertext, v.iv, v.tag, v.content_hash
             FROM collaborators c
             JOIN notes n ON n.id = c.note_id
             JOIN (SELECT note_id, MAX(version) AS max_version
                   FROM note_versions GROUP BY note_id) latest
               ON latest.note_id = c.note_id
             JOIN note_versions v
               ON v.note_id = latest.note_id AND v.version = latest.max_version
             WHERE c.user_id = ?1
             ORDER BY n.title",
        )?;

        let rows = stmt.query_map(params![user_id.0], |row| {
            let role = parse_role(0, row.get("role")?)?;
            let latest = row_to_version(row)?;
            let entry = NoteEntry {
                note: Note {
                    id: latest.note_id,
                    title: row.get("title")?,
                },
                latest,
                wrapped_key: Blob::from(row.get::<_, Vec<u8>>("wrapped_key")?),
            };
            Ok((role, entry))
        })?;

        let mut listing = CollaboratorListing::default();
        for row in rows {
            let (role, entry) = row?;
            listing.push(role, entry);
        }
        Ok(listing)
    }

    fn insert_user(&mut self, username: &str, public_key: &Blob) -> Result<InsertResult<User>> {
        let inserted = self.conn.execute(
            "INSERT INTO users (username, public_key, created_at) VALUES (?1, ?2, ?3)",
            params![username, public_key.as_bytes(), crate::now_millis()],
        );

        Ok(match unique_or(inserted)? {
            InsertResult::Inserted(_) => InsertResult::Inserted(User {
                id: UserId(self.conn.last_insert_rowid()),
                username: username.to_string(),
                public_key: public_key.clone(),
            }),
            InsertResult::Conflict => InsertResult::Conflict,
        })
    }

    fn insert_note(&mut self, title: &str) -> Result<InsertResult<Note>> {
        let inserted = self.conn.execute(
            "INSERT INTO notes (title, created_at) VALUES (?1, ?2)",
            params![title, crate::now_millis()],
        );

        Ok(match unique_or(inserted)? {
            InsertResult::Inserted(_) => InsertResult::Inserted(Note {
                id: NoteId(self.conn.last_insert_rowid()),
                title: title.to_string(),
            }),
            InsertResult::Conflict => InsertResult::Conflict,
        })
    }

    fn append_version(
        &mut self,
        note_id: NoteId,
        version: u64,
        sealed: &SealedNote,
    ) -> Result<InsertResult<NoteVersion>> {
        let stored = i64::try_from(version)
            .map_err(|_| StoreError::InvalidData(format!("version {version} out of range")))?;
        let content_hash = sealed.content_hash();
        let inserted = self.conn.execute(
            "INSERT INTO note_versions
                (note_id, version, ciphertext, iv, tag, content_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                note_id.0,
                stored,
                sealed.ciphertext.as_bytes(),
                sealed.iv.as_bytes(),
                sealed.tag.as_bytes(),
                content_hash.as_bytes().as_slice(),
                crate::now_millis(),
            ],
        );

        Ok(match unique_or(inserted)? {
            InsertResult::Inserted(_) => InsertResult::Inserted(NoteVersion {
                id: VersionId(self.conn.last_insert_rowid()),
                note_id,
                version,
                sealed: sealed.clone(),
                content_hash,
            }),
            InsertResult::Conflict => InsertResult::Conflict,
        })
    }

    fn insert_collaborator(
        &mut self,
        collaborator: &Collaborator,
    ) -> Result<InsertResult<CollaboratorId>> {
        let inserted = self.conn.execute(
            "INSERT INTO collaborators (note_id, user_id, role, wrapped_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                collaborator.note_id.0,
                collaborator.user_id.0,
                collaborator.role.as_str(),
                collaborator.wrapped_key.as_bytes(),
                crate::now_millis(),
            ],
        );

        Ok(match unique_or(inserted)? {
            InsertResult::Inserted(_) => InsertResult::Inserted(collaborator.id()),
            InsertResult::Conflict => InsertResult::Conflict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed(tag: u8) -> SealedNote {
        SealedNote::new(vec![tag; 32], vec![tag; 12], vec![tag; 16])
    }

    async fn run<T: Send + 'static>(
        store: &SqliteStore,
        f: impl FnOnce(&mut dyn NoteTx) -> Result<T> + Send + 'static,
    ) -> T {
        store.transact(f).await.unwrap()
    }

    fn owner_of(note: &Note, user: &User) -> Collaborator {
        Collaborator {
            note_id: note.id,
            user_id: user.id,
            role: Role::Owner,
            wrapped_key: Blob::from("owner-key"),
        }
    }

    #[tokio::test]
    async fn test_latest_is_max_not_count() {
        let store = SqliteStore::open_memory().unwrap();

        let latest = run(&store, |tx| {
            let note = tx.insert_note("gappy")?.inserted().unwrap();
            tx.append_version(note.id, 1, &sealed(1))?;
            tx.append_version(note.id, 5, &sealed(5))?;
            tx.append_version(note.id, 3, &sealed(3))?;
            tx.find_latest_version(note.id)
        })
        .await
        .unwrap();

        assert_eq!(latest.version, 5);
        assert_eq!(latest.sealed, sealed(5));
        assert_eq!(latest.content_hash, sealed(5).content_hash());
    }

    #[tokio::test]
    async fn test_duplicate_version_conflicts() {
        let store = SqliteStore::open_memory().unwrap();

        let (first, second) = run(&store, |tx| {
            let note = tx.insert_note("a")?.inserted().unwrap();
            let first = tx.append_version(note.id, 1, &sealed(1))?;
            let second = tx.append_version(note.id, 1, &sealed(2))?;
            Ok((first, second))
        })
        .await;

        assert!(!first.is_conflict());
        assert!(second.is_conflict());
    }

    #[tokio::test]
    async fn test_duplicate_title_and_username_conflict() {
        let store = SqliteStore::open_memory().unwrap();

        let (note, user) = run(&store, |tx| {
            tx.insert_note("a")?;
            tx.insert_user("alice", &Blob::from("pk"))?;
            let note = tx.insert_note("a")?;
            let user = tx.insert_user("alice", &Blob::from("pk2"))?;
            Ok((note, user))
        })
        .await;

        assert!(note.is_conflict());
        assert!(user.is_conflict());
    }

    #[tokio::test]
    async fn test_error_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();

        let result: Result<()> = store
            .transact(|tx| {
                tx.insert_note("doomed")?;
                Err(StoreError::InvalidData("abort".into()))
            })
            .await;
        assert!(result.is_err());

        let found = run(&store, |tx| tx.find_note_by_title("doomed")).await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_panic_rolls_back_and_store_stays_usable() {
        let store = SqliteStore::open_memory().unwrap();

        let result: Result<()> = store
            .transact(|tx| {
                tx.insert_note("doomed")?;
                panic!("closure failed mid-transaction");
            })
            .await;
        assert!(matches!(result, Err(StoreError::Task(_))));

        let found = run(&store, |tx| tx.find_note_by_title("doomed")).await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_roles_and_listing() {
        let store = SqliteStore::open_memory().unwrap();

        let (listing, roles) = run(&store, |tx| {
            let alice = tx.insert_user("alice", &Blob::from("pk-a"))?.inserted().unwrap();
            let bob = tx.insert_user("bob", &Blob::from("pk-b"))?.inserted().unwrap();

            let own = tx.insert_note("a-note")?.inserted().unwrap();
            tx.append_version(own.id, 1, &sealed(1))?;
            tx.insert_collaborator(&owner_of(&own, &alice))?;

            let shared = tx.insert_note("b-note")?.inserted().unwrap();
            tx.append_version(shared.id, 1, &sealed(1))?;
            tx.append_version(shared.id, 2, &sealed(2))?;
            tx.insert_collaborator(&owner_of(&shared, &bob))?;
            tx.insert_collaborator(&Collaborator {
                note_id: shared.id,
                user_id: alice.id,
                role: Role::Viewer,
                wrapped_key: Blob::from("alice-key"),
            })?;

            let roles = tx.roles_for(alice.id, own.id)?;
            let listing = tx.list_collaborator_roles(alice.id)?;
            Ok((listing, roles))
        })
        .await;

        assert!(roles.is_owner());
        assert_eq!(listing.owner.len(), 1);
        assert_eq!(listing.viewer.len(), 1);
        assert!(listing.editor.is_empty());
        assert_eq!(listing.owner[0].note.title, "a-note");
        assert_eq!(listing.owner[0].latest.version, 1);
        assert_eq!(listing.viewer[0].latest.version, 2);
        assert_eq!(listing.viewer[0].wrapped_key, Blob::from("alice-key"));
    }

    fn failing_column(result: Result<impl std::fmt::Debug>) -> usize {
        match result {
            Err(StoreError::Database(rusqlite::Error::FromSqlConversionFailure(idx, ..))) => idx,
            other => panic!("expected a conversion failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_hash_reports_its_column() {
        let store = SqliteStore::open_memory().unwrap();
        let (user, note) = run(&store, |tx| {
            let user = tx.insert_user("alice", &Blob::from("pk"))?.inserted().unwrap();
            let note = tx.insert_note("n")?.inserted().unwrap();
            tx.append_version(note.id, 1, &sealed(1))?;
            tx.insert_collaborator(&owner_of(&note, &user))?;
            Ok((user, note))
        })
        .await;

        lock(&store.conn)
            .execute("UPDATE note_versions SET content_hash = x'00'", [])
            .unwrap();

        let (latest, listing) = run(&store, move |tx| {
            Ok((
                failing_column(tx.find_latest_version(note.id)),
                failing_column(tx.list_collaborator_roles(user.id)),
            ))
        })
        .await;
        assert_eq!(latest, 6);
        assert_eq!(listing, 9);
    }

    #[tokio::test]
    async fn test_second_owner_conflicts() {
        let store = SqliteStore::open_memory().unwrap();

        let second = run(&store, |tx| {
            let u1 = tx.insert_user("u1", &Blob::from("1"))?.inserted().unwrap();
            let u2 = tx.insert_user("u2", &Blob::from("2"))?.inserted().unwrap();
            let note = tx.insert_note("n")?.inserted().unwrap();
            tx.insert_collaborator(&owner_of(&note, &u1))?;
            tx.insert_collaborator(&owner_of(&note, &u2))
        })
        .await;

        assert!(second.is_conflict());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            run(&store, |tx| {
                let note = tx.insert_note("kept")?.inserted().unwrap();
                tx.append_version(note.id, 1, &sealed(9))?;
                Ok(())
            })
            .await;
        }

        let store = SqliteStore::open(&path).unwrap();
        let versions = run(&store, |tx| {
            let note = tx.find_note_by_title("kept")?.unwrap();
            tx.list_versions(note.id)
        })
        .await;
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].sealed, sealed(9));
    }
}
