//! # notevault Core
//!
//! Pure data model for notevault: users, notes, the append-only version
//! history, and the opaque encrypted payloads clients upload.
//!
//! This crate contains no I/O and no storage. It never decrypts or inspects
//! ciphertext; every encrypted field is an opaque [`Blob`].
//!
//! ## Key Types
//!
//! - [`Note`] - A logical document identified by a unique title
//! - [`NoteVersion`] - One append-only snapshot of a note's ciphertext
//! - [`SealedNote`] - Ciphertext, IV and authentication tag as uploaded
//! - [`NotePayload`] - A sealed note plus declared version and optional wrapped key
//! - [`ContentHash`] - BLAKE3 fingerprint of a sealed note's bytes

pub mod error;
pub mod model;
pub mod types;
pub mod validation;

pub use error::ValidationError;
pub use model::{Note, NotePayload, NoteVersion, SealedNote, User};
pub use types::{Blob, ContentHash, NoteId, UserId, VersionId};
pub use validation::{validate_key, validate_payload, validate_title, validate_username, Limits};
