//! Strong type definitions for notevault.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row identifier of a registered user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Row identifier of a note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(pub i64);

/// Row identifier of a single note version.
///
/// Distinct from the version *number*: ids are global, numbers are per note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note#{}", self.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "version#{}", self.0)
    }
}

/// An opaque byte string supplied by a client.
///
/// Ciphertexts, IVs, tags, wrapped keys and public keys are all blobs.
/// The server stores and returns them untouched.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blob(Bytes);

impl Blob {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Never dump full ciphertext into logs.
impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = &self.0[..self.0.len().min(8)];
        write!(f, "Blob({} bytes, {}..)", self.0.len(), hex::encode(prefix))
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl From<&'static str> for Blob {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

/// A 32-byte BLAKE3 fingerprint of a sealed note.
///
/// Computed by the server over the opaque bytes; it says nothing about
/// the plaintext.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl TryFrom<&[u8]> for ContentHash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_debug_is_truncated() {
        let blob = Blob::from(vec![0xab; 4096]);
        let debug = format!("{:?}", blob);
        assert_eq!(debug, "Blob(4096 bytes, abababababababab..)");
    }

    #[test]
    fn test_blob_debug_short() {
        let blob = Blob::from(&[0x01u8, 0x02][..]);
        assert_eq!(format!("{:?}", blob), "Blob(2 bytes, 0102..)");
    }

    #[test]
    fn test_content_hash_display() {
        let hash = ContentHash::from_bytes([0xcd; 32]);
        assert_eq!(format!("{}", hash), "cdcdcdcdcdcdcdcd");
        assert!(format!("{:?}", hash).starts_with("ContentHash("));
    }

    #[test]
    fn test_content_hash_from_wrong_length() {
        assert!(ContentHash::try_from(&[0u8; 31][..]).is_err());
    }

    #[test]
    fn test_ids_display() {
        assert_eq!(NoteId(7).to_string(), "note#7");
        assert_eq!(UserId(3).to_string(), "user#3");
        assert_eq!(VersionId(11).to_string(), "version#11");
    }
}
