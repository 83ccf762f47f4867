//! The Vault: unified API for notevault.
//!
//! The Vault owns a store handle and a configuration. Every operation runs
//! as one store transaction; the transaction handle is passed explicitly to
//! the engine functions in [`crate::upsert`], [`crate::collaborators`] and
//! [`crate::queries`].

use std::sync::Arc;

use tracing::{info, info_span, Instrument, Span};

use notevault_core::{Blob, NotePayload, NoteVersion, User};
use notevault_perms::Role;
use notevault_store::{NoteTx, Store};

use crate::collaborators::{self, CollaboratorAdded};
use crate::config::VaultConfig;
use crate::error::Result;
use crate::queries::{self, NoteListing, NoteView};
use crate::upsert::{self, UpsertOutcome, Upserted};

/// The main Vault struct.
///
/// Identities passed in are usernames that an outer layer has already
/// authenticated.
pub struct Vault<S: Store> {
    store: Arc<S>,
    config: VaultConfig,
}

impl<S: Store> Clone for Vault<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> Vault<S> {
    /// Create a new vault over `store`.
    pub fn new(store: S, config: VaultConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Run `f` in one transaction, with `span` entered on whichever thread
    /// the store executes it.
    async fn run<T, F>(&self, span: Span, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn NoteTx, &VaultConfig) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let config = self.config.clone();
        let inner = span.clone();
        self.store
            .transact(move |tx| {
                let _entered = inner.enter();
                f(tx, &config)
            })
            .instrument(span)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a note or append a version to it.
    ///
    /// See [`crate::upsert`] for how the declared version is resolved.
    pub async fn upsert(&self, identity: &str, title: &str, payload: NotePayload) -> Result<Upserted> {
        let span = info_span!("upsert", identity, title, declared = payload.version);
        let (identity, title) = (identity.to_owned(), title.to_owned());

        let result = self
            .run(span.clone(), move |tx, config| {
                upsert::upsert(tx, config, &identity, &title, &payload)
            })
            .await?;

        if result.outcome != UpsertOutcome::Unchanged {
            span.in_scope(|| {
                info!(
                    note_id = %result.note_id,
                    version = result.version,
                    outcome = ?result.outcome,
                    "committed note version"
                )
            });
        }
        Ok(result)
    }

    /// Share a note: append `payload` as the next version and grant `role`
    /// to `target`, atomically. Only the owner may share.
    pub async fn add_collaborator(
        &self,
        identity: &str,
        target: &str,
        title: &str,
        role: Role,
        payload: NotePayload,
    ) -> Result<CollaboratorAdded> {
        let span = info_span!("add_collaborator", identity, target, title, %role);
        let (identity, target, title) = (identity.to_owned(), target.to_owned(), title.to_owned());

        let added = self
            .run(span.clone(), move |tx, config| {
                collaborators::add_collaborator(tx, config, &identity, &target, &title, role, &payload)
            })
            .await?;

        span.in_scope(|| info!(version = added.version, "added collaborator"));
        Ok(added)
    }

    /// Register a user with the public key other users wrap note keys to.
    pub async fn register_user(&self, username: &str, public_key: impl Into<Blob>) -> Result<User> {
        let span = info_span!("register_user", username);
        let username = username.to_owned();
        let public_key = public_key.into();

        let user = self
            .run(span.clone(), move |tx, config| {
                queries::register_user(tx, &config.limits(), &username, &public_key)
            })
            .await?;

        span.in_scope(|| info!(user_id = %user.id, "registered user"));
        Ok(user)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Every note `identity` collaborates on, grouped by role.
    pub async fn list_notes_for_user(&self, identity: &str) -> Result<NoteListing> {
        let span = info_span!("list_notes_for_user", identity);
        let identity = identity.to_owned();
        self.run(span, move |tx, _| queries::list_notes_for_user(tx, &identity))
            .await
    }

    /// One version of a note (`None` for the latest) with the caller's
    /// wrapped key. Any role may read.
    pub async fn read_note(&self, identity: &str, title: &str, version: Option<u64>) -> Result<NoteView> {
        let span = info_span!("read_note", identity, title, ?version);
        let (identity, title) = (identity.to_owned(), title.to_owned());
        self.run(span, move |tx, _| queries::read_note(tx, &identity, &title, version))
            .await
    }

    /// The full version history of a note, oldest first. Any role may read.
    pub async fn history(&self, identity: &str, title: &str) -> Result<Vec<NoteVersion>> {
        let span = info_span!("history", identity, title);
        let (identity, title) = (identity.to_owned(), title.to_owned());
        self.run(span, move |tx, _| queries::history(tx, &identity, &title))
            .await
    }

    /// Look up a user, typically to fetch the public key to wrap for.
    pub async fn user(&self, username: &str) -> Result<User> {
        let span = info_span!("user", username);
        let username = username.to_owned();
        self.run(span, move |tx, _| queries::user(tx, &username)).await
    }
}
