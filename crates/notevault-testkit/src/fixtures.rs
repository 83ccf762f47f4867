//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Once;

use notevault::{NotePayload, Vault, VaultConfig};
use notevault_core::Blob;
use notevault_store::{MemoryStore, SqliteStore, Store};

use crate::client::{ClientIdentity, NoteKey};

/// A named user with a deterministic X25519 identity.
pub struct Party {
    pub username: String,
    pub identity: ClientIdentity,
}

impl Party {
    /// Create a party whose keys derive from `seed`.
    pub fn with_seed(username: &str, seed: u8) -> Self {
        Self {
            username: username.to_string(),
            identity: ClientIdentity::from_seed([seed; 32]),
        }
    }

    /// The public key to register.
    pub fn public_key(&self) -> Blob {
        self.identity.public_key()
    }

    /// Payload for version 1 of a new note: sealed under `key`, with `key`
    /// wrapped for this party as owner.
    pub fn create_payload(&self, key: &NoteKey, plaintext: &str) -> NotePayload {
        self.payload_for(key, plaintext, 1, self)
    }

    /// Payload for `version`, with `key` wrapped for `recipient`.
    pub fn payload_for(&self, key: &NoteKey, plaintext: &str, version: u64, recipient: &Party) -> NotePayload {
        key.payload(plaintext.as_bytes(), version, Some(&recipient.public_key()))
            .expect("sealing a fixture payload")
    }

    /// Payload for `version` without a wrapped key.
    pub fn edit_payload(&self, key: &NoteKey, plaintext: &str, version: u64) -> NotePayload {
        key.payload(plaintext.as_bytes(), version, None)
            .expect("sealing a fixture payload")
    }
}

/// A vault with alice, bob and carol registered.
pub struct Scenario<S: Store> {
    pub vault: Vault<S>,
    pub alice: Party,
    pub bob: Party,
    pub carol: Party,
}

impl<S: Store> Scenario<S> {
    /// Register the three parties in a vault over `store`.
    pub async fn new(store: S, config: VaultConfig) -> Self {
        let vault = Vault::new(store, config);
        let alice = Party::with_seed("alice", 1);
        let bob = Party::with_seed("bob", 2);
        let carol = Party::with_seed("carol", 3);

        for party in [&alice, &bob, &carol] {
            vault
                .register_user(&party.username, party.public_key())
                .await
                .expect("registering fixture user");
        }

        Self {
            vault,
            alice,
            bob,
            carol,
        }
    }
}

impl Scenario<MemoryStore> {
    /// Scenario over an in-memory store with default configuration.
    pub async fn memory() -> Self {
        Self::new(MemoryStore::new(), VaultConfig::default()).await
    }
}

impl Scenario<SqliteStore> {
    /// Scenario over an in-memory SQLite database with default configuration.
    pub async fn sqlite() -> Self {
        let store = SqliteStore::open_memory().expect("opening in-memory sqlite");
        Self::new(store, VaultConfig::default()).await
    }
}

/// Create `count` parties named `user0`, `user1`, ...
pub fn multi_party(count: usize) -> Vec<Party> {
    (0..count)
        .map(|i| Party::with_seed(&format!("user{i}"), i as u8 + 10))
        .collect()
}

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Output is captured by the test harness; run with `--nocapture` to see it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scenario_registers_parties() {
        let scenario = Scenario::memory().await;

        let alice = scenario.vault.user("alice").await.unwrap();
        assert_eq!(alice.public_key, scenario.alice.public_key());
        assert!(scenario.vault.user("carol").await.is_ok());
    }

    #[tokio::test]
    async fn test_create_payload_is_openable_by_owner() {
        let alice = Party::with_seed("alice", 1);
        let key = NoteKey::generate();

        let payload = alice.create_payload(&key, "hello");
        assert_eq!(payload.version, 1);

        let wrapped = payload.wrapped_key.as_ref().unwrap();
        let recovered = alice.identity.unwrap_key(wrapped).unwrap();
        assert_eq!(recovered.open(&payload.sealed).unwrap(), b"hello");
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party(3);
        assert_ne!(parties[0].public_key(), parties[1].public_key());
        assert_ne!(parties[1].public_key(), parties[2].public_key());
        assert_eq!(parties[2].username, "user2");
    }
}
