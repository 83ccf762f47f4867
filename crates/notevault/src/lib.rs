//! # notevault
//!
//! End-to-end encrypted notes with versioned writes and role-based sharing.
//!
//! ## Overview
//!
//! Clients seal notes before upload; the server side implemented here only
//! ever sees opaque ciphertext, IVs, tags and wrapped keys. What it does
//! enforce:
//!
//! - **Optimistic concurrency**: every write declares the version it
//!   produces. Stale writes fail, exact replays are no-ops, and two writers
//!   racing for the same version cannot both win.
//! - **Append-only history**: versions are never rewritten; the latest is
//!   the highest version number.
//! - **Roles**: the creator of a note is its single owner. Only the owner
//!   shares; owners and editors write; every collaborator reads.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use notevault::{NotePayload, Role, SealedNote, Vault, VaultConfig};
//! use notevault::store::SqliteStore;
//!
//! async fn example() -> notevault::Result<()> {
//!     let store = SqliteStore::open("notes.db")?;
//!     let vault = Vault::new(store, VaultConfig::default());
//!
//!     vault.register_user("alice", vec![1u8; 32]).await?;
//!     vault.register_user("bob", vec![2u8; 32]).await?;
//!
//!     // First write creates the note; alice becomes its owner.
//!     let sealed = SealedNote::new(vec![0u8; 64], vec![0u8; 12], vec![0u8; 16]);
//!     let payload = NotePayload::new(sealed.clone(), 1).with_wrapped_key(vec![9u8; 48]);
//!     vault.upsert("alice", "groceries", payload).await?;
//!
//!     // Sharing republishes the note with a key wrapped for bob.
//!     let share = NotePayload::new(sealed, 2).with_wrapped_key(vec![8u8; 48]);
//!     vault
//!         .add_collaborator("alice", "bob", "groceries", Role::Editor, share)
//!         .await?;
//!
//!     let listing = vault.list_notes_for_user("bob").await?;
//!     assert_eq!(listing.editor.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `notevault::core` - Data model and input validation
//! - `notevault::perms` - Roles and capability predicates
//! - `notevault::store` - Storage traits, SQLite and in-memory backends

pub mod collaborators;
pub mod config;
pub mod error;
pub mod queries;
pub mod upsert;
pub mod vault;

// Re-export component crates
pub use notevault_core as core;
pub use notevault_perms as perms;
pub use notevault_store as store;

// Re-export main types for convenience
pub use collaborators::CollaboratorAdded;
pub use config::VaultConfig;
pub use error::{ErrorKind, Missing, Result, VaultError};
pub use queries::{NoteListing, NoteView};
pub use upsert::{UpsertOutcome, Upserted};
pub use vault::Vault;

pub use notevault_core::{Blob, ContentHash, NoteId, NotePayload, NoteVersion, SealedNote, User};
pub use notevault_perms::{CollaboratorId, Role, RoleSet};
pub use notevault_store::NoteEntry;
