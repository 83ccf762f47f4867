//! Proptest generators for property-based testing.

use proptest::prelude::*;

use notevault_core::{NotePayload, SealedNote};
use notevault_perms::Role;

/// Generate a valid note title.
pub fn title() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 _-]{0,31}".prop_map(String::from)
}

/// Generate a valid username.
pub fn username() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}".prop_map(String::from)
}

/// Generate a non-empty opaque blob of at most `max_len` bytes.
pub fn blob(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len)
}

/// Generate sealed-note shaped bytes (not real ciphertext).
pub fn sealed_note() -> impl Strategy<Value = SealedNote> {
    (blob(256), any::<[u8; 12]>(), any::<[u8; 16]>())
        .prop_map(|(ciphertext, iv, tag)| SealedNote::new(ciphertext, iv.to_vec(), tag.to_vec()))
}

/// Generate a payload at `version` without a wrapped key.
pub fn payload(version: u64) -> impl Strategy<Value = NotePayload> {
    sealed_note().prop_map(move |sealed| NotePayload::new(sealed, version))
}

/// Generate a role an owner may grant.
pub fn grantable_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Editor), Just(Role::Viewer)]
}

/// One write attempt in a random sequence against a single note.
#[derive(Debug, Clone)]
pub struct WriteAttempt {
    /// Which of the participating writers issues it.
    pub writer: usize,
    /// Declared version number.
    pub declared: u64,
    /// Content seed; equal seeds produce equal bytes.
    pub content: u8,
}

impl WriteAttempt {
    /// The sealed bytes for this attempt.
    pub fn sealed(&self) -> SealedNote {
        SealedNote::new(vec![self.content; 16], vec![self.content; 12], vec![self.content; 16])
    }
}

/// A sequence of writes from `writers` writers whose declared versions
/// wander around the plausible range: stale, replayed, next and ahead.
pub fn write_sequence(writers: usize, max_len: usize) -> impl Strategy<Value = Vec<WriteAttempt>> {
    prop::collection::vec(
        (0..writers.max(1), 1u64..=12, any::<u8>()).prop_map(|(writer, declared, content)| {
            WriteAttempt {
                writer,
                declared,
                content,
            }
        }),
        1..=max_len,
    )
}
