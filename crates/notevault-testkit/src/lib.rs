//! # notevault Testkit
//!
//! Testing utilities for notevault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Client**: Seals notes with ChaCha20-Poly1305 and wraps note keys for
//!   recipients over X25519, so tests upload the same shapes a real client does
//! - **Fixtures**: A vault with alice, bob and carol already registered
//! - **Generators**: Proptest strategies for titles, payloads and write sequences
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use notevault_testkit::{NoteKey, Scenario};
//!
//! async fn example() {
//!     let s = Scenario::memory().await;
//!     let key = NoteKey::generate();
//!
//!     let payload = s.alice.create_payload(&key, "buy milk");
//!     s.vault.upsert("alice", "groceries", payload).await.unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use notevault_testkit::generators::write_sequence;
//!
//! proptest! {
//!     #[test]
//!     fn versions_only_grow(writes in write_sequence(2, 20)) {
//!         // apply `writes` and check the history
//!     }
//! }
//! ```

pub mod client;
pub mod error;
pub mod fixtures;
pub mod generators;

pub use client::{ClientIdentity, NoteKey};
pub use error::ClientError;
pub use fixtures::{init_tracing, multi_party, Party, Scenario};
pub use generators::{write_sequence, WriteAttempt};
