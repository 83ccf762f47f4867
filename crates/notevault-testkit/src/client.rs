//! A minimal client that produces real sealed notes and wrapped keys.
//!
//! The server never looks inside these bytes; this exists so tests exercise
//! the vault with the same shapes a real client uploads, and can check that
//! what comes back still decrypts.
//!
//! - Notes are sealed with ChaCha20-Poly1305 under a random 256-bit note key.
//!   The nonce is stored as the IV and the 16-byte tag is kept detached.
//! - Note keys are wrapped per recipient: X25519 between a fresh ephemeral
//!   key and the recipient's public key, a BLAKE3-derived wrapping key, then
//!   ChaCha20-Poly1305. The wrapped form is CBOR.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Nonce, Tag,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use notevault_core::{Blob, NotePayload, SealedNote};

use crate::error::{ClientError, Result};

const TAG_LEN: usize = 16;

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn cipher(key: &[u8; 32]) -> Result<ChaCha20Poly1305> {
    ChaCha20Poly1305::new_from_slice(key).map_err(|e| ClientError::Encryption(e.to_string()))
}

/// A user's X25519 identity.
pub struct ClientIdentity {
    secret: StaticSecret,
    public: PublicKey,
}

impl ClientIdentity {
    /// Generate a new random identity.
    pub fn generate() -> Self {
        Self::from_seed(random_bytes())
    }

    /// Create a deterministic identity from seed bytes.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let secret = StaticSecret::from(seed);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public key, as registered with the vault.
    pub fn public_key(&self) -> Blob {
        Blob::from(self.public.as_bytes().to_vec())
    }

    /// Recover a note key wrapped for this identity.
    pub fn unwrap_key(&self, wrapped: &Blob) -> Result<NoteKey> {
        WrappedKey::from_bytes(wrapped.as_bytes())?.open(&self.secret)
    }
}

/// The symmetric key of one note.
#[derive(Clone, PartialEq, Eq)]
pub struct NoteKey([u8; 32]);

impl NoteKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(random_bytes())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt `plaintext` into a sealed note.
    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedNote> {
        let nonce: [u8; 12] = random_bytes();
        let mut buffer = plaintext.to_vec();
        let tag = cipher(&self.0)?
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|e| ClientError::Encryption(e.to_string()))?;

        Ok(SealedNote::new(buffer, nonce.to_vec(), tag.to_vec()))
    }

    /// Decrypt a sealed note.
    pub fn open(&self, sealed: &SealedNote) -> Result<Vec<u8>> {
        if sealed.iv.len() != 12 {
            return Err(ClientError::Decryption(format!(
                "nonce must be 12 bytes, got {}",
                sealed.iv.len()
            )));
        }
        if sealed.tag.len() != TAG_LEN {
            return Err(ClientError::Decryption(format!(
                "tag must be {TAG_LEN} bytes, got {}",
                sealed.tag.len()
            )));
        }

        let mut buffer = sealed.ciphertext.as_bytes().to_vec();
        cipher(&self.0)?
            .decrypt_in_place_detached(
                Nonce::from_slice(sealed.iv.as_bytes()),
                b"",
                &mut buffer,
                Tag::from_slice(sealed.tag.as_bytes()),
            )
            .map_err(|e| ClientError::Decryption(e.to_string()))?;
        Ok(buffer)
    }

    /// Wrap this key for the holder of `recipient` (a registered public key).
    pub fn wrap_for(&self, recipient: &Blob) -> Result<Blob> {
        let recipient: [u8; 32] = recipient
            .as_bytes()
            .try_into()
            .map_err(|_| ClientError::InvalidKey(recipient.len()))?;
        let wrapped = WrappedKey::seal(self, &PublicKey::from(recipient))?;
        Ok(Blob::from(wrapped.to_bytes()?))
    }

    /// Build a payload for `version` carrying `plaintext`, with this key
    /// wrapped for `recipient` when given.
    pub fn payload(&self, plaintext: &[u8], version: u64, recipient: Option<&Blob>) -> Result<NotePayload> {
        let payload = NotePayload::new(self.seal(plaintext)?, version);
        match recipient {
            Some(public_key) => Ok(payload.with_wrapped_key(self.wrap_for(public_key)?)),
            None => Ok(payload),
        }
    }
}

impl std::fmt::Debug for NoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NoteKey(..)")
    }
}

/// A note key encrypted to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct WrappedKey {
    ephemeral_public: [u8; 32],
    nonce: [u8; 12],
    encrypted_key: Vec<u8>,
}

/// Wrapping key from the shared secret, bound to both public keys.
fn wrapping_key(shared: &[u8; 32], ephemeral: &PublicKey, recipient: &PublicKey) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("notevault-v1 key-wrap");
    hasher.update(shared);
    hasher.update(ephemeral.as_bytes());
    hasher.update(recipient.as_bytes());
    *hasher.finalize().as_bytes()
}

impl WrappedKey {
    fn seal(key: &NoteKey, recipient: &PublicKey) -> Result<Self> {
        let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
        let ephemeral_public = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(recipient);
        let wrap = wrapping_key(shared.as_bytes(), &ephemeral_public, recipient);

        let nonce: [u8; 12] = random_bytes();
        let mut encrypted_key = key.as_bytes().to_vec();
        let tag = cipher(&wrap)?
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut encrypted_key)
            .map_err(|e| ClientError::Encryption(e.to_string()))?;
        encrypted_key.extend_from_slice(&tag);

        Ok(Self {
            ephemeral_public: *ephemeral_public.as_bytes(),
            nonce,
            encrypted_key,
        })
    }

    fn open(&self, secret: &StaticSecret) -> Result<NoteKey> {
        if self.encrypted_key.len() != 32 + TAG_LEN {
            return Err(ClientError::InvalidKey(self.encrypted_key.len()));
        }
        let ephemeral = PublicKey::from(self.ephemeral_public);
        let recipient = PublicKey::from(secret);
        let shared = secret.diffie_hellman(&ephemeral);
        let wrap = wrapping_key(shared.as_bytes(), &ephemeral, &recipient);

        let (body, tag) = self.encrypted_key.split_at(32);
        let mut key = body.to_vec();
        cipher(&wrap)?
            .decrypt_in_place_detached(Nonce::from_slice(&self.nonce), b"", &mut key, Tag::from_slice(tag))
            .map_err(|e| ClientError::Decryption(e.to_string()))?;

        let bytes: [u8; 32] = key
            .as_slice()
            .try_into()
            .map_err(|_| ClientError::InvalidKey(key.len()))?;
        Ok(NoteKey(bytes))
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| ClientError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| ClientError::Serialization(e.to_string()))
    }
}
