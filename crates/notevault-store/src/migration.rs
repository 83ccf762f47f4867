//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Registered users; credentials live outside this database
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            public_key BLOB NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Logical documents
        CREATE TABLE notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        );

        -- Append-only version history
        CREATE TABLE note_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            note_id INTEGER NOT NULL REFERENCES notes(id),
            version INTEGER NOT NULL CHECK (version >= 1),
            ciphertext BLOB NOT NULL,
            iv BLOB NOT NULL,
            tag BLOB NOT NULL,
            content_hash BLOB NOT NULL,       -- 32 bytes, BLAKE3 over (ciphertext, iv, tag)
            created_at INTEGER NOT NULL,

            UNIQUE(note_id, version)
        );

        -- Role bindings, one per (note, user)
        CREATE TABLE collaborators (
            note_id INTEGER NOT NULL REFERENCES notes(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            role TEXT NOT NULL CHECK (role IN ('owner', 'editor', 'viewer')),
            wrapped_key BLOB NOT NULL,
            created_at INTEGER NOT NULL,

            PRIMARY KEY (note_id, user_id)
        );

        CREATE UNIQUE INDEX idx_collaborators_one_owner
            ON collaborators(note_id) WHERE role = 'owner';
        CREATE INDEX idx_collaborators_user ON collaborators(user_id);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"notes".to_string()));
        assert!(tables.contains(&"note_versions".to_string()));
        assert!(tables.contains(&"collaborators".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, 0)",
            [CURRENT_VERSION + 1],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }

    #[test]
    fn test_version_unique_per_note() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        conn.execute("INSERT INTO notes (title, created_at) VALUES ('a', 0)", [])
            .unwrap();
        let insert = "INSERT INTO note_versions
            (note_id, version, ciphertext, iv, tag, content_hash, created_at)
            VALUES (1, 1, x'00', x'00', x'00', x'00', 0)";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }

    #[test]
    fn test_single_owner_per_note() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        conn.execute_batch(
            "INSERT INTO notes (title, created_at) VALUES ('a', 0);
             INSERT INTO users (username, public_key, created_at) VALUES ('u1', x'01', 0);
             INSERT INTO users (username, public_key, created_at) VALUES ('u2', x'02', 0);
             INSERT INTO collaborators (note_id, user_id, role, wrapped_key, created_at)
                 VALUES (1, 1, 'owner', x'aa', 0);",
        )
        .unwrap();

        let second_owner = conn.execute(
            "INSERT INTO collaborators (note_id, user_id, role, wrapped_key, created_at)
             VALUES (1, 2, 'owner', x'bb', 0)",
            [],
        );
        assert!(second_owner.is_err());
    }
}
