//! # notevault Store
//!
//! Transactional persistence for users, notes, versions and collaborators,
//! with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The engine is storage-agnostic. It hands a closure to [`Store::transact`]
//! and performs every read and write through the [`NoteTx`] it receives.
//! The primary implementation is [`SqliteStore`], with [`MemoryStore`] for
//! testing.
//!
//! ## Key Types
//!
//! - [`Store`] - Async entry point that runs one transaction
//! - [`NoteTx`] - Lookups and inserts available inside a transaction
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Insert outcome, `Conflict` on a unique violation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use notevault_store::{SqliteStore, Store, StoreError};
//!
//! async fn example() -> Result<(), StoreError> {
//!     let store = SqliteStore::open("notes.db")?;
//!
//!     let note = store
//!         .transact(|tx| tx.find_note_by_title("groceries"))
//!         .await?;
//!     println!("{:?}", note);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **All-or-nothing**: a transaction commits only if its closure returns `Ok`
//! - **Latest is a maximum**: the latest version is `MAX(version)`, never a count
//! - **Unique keys settle races**: (note_id, version), title, username and the
//!   single owner per note are enforced by the store itself

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CollaboratorListing, InsertResult, NoteEntry, NoteTx, Store};

/// Milliseconds since the Unix epoch, for `created_at` columns.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
