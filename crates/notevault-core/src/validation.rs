//! Shape checks for incoming writes.
//!
//! These only look at lengths and presence. Ciphertext content is never
//! interpreted.

use crate::error::ValidationError;
use crate::model::{NotePayload, SealedNote};
use crate::types::Blob;

/// Size limits applied to client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum title length in bytes.
    pub max_title_len: usize,
    /// Maximum username length in bytes.
    pub max_username_len: usize,
    /// Maximum size of any single blob in bytes.
    pub max_blob_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_title_len: 255,
            max_username_len: 255,
            max_blob_len: 16 * 1024 * 1024,
        }
    }
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            max,
        });
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters { field });
    }
    Ok(())
}

fn check_blob(field: &'static str, blob: &Blob, max: usize) -> Result<(), ValidationError> {
    if blob.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if blob.len() > max {
        return Err(ValidationError::TooLong {
            field,
            len: blob.len(),
            max,
        });
    }
    Ok(())
}

/// Validate a note title.
pub fn validate_title(title: &str, limits: &Limits) -> Result<(), ValidationError> {
    check_text("title", title, limits.max_title_len)
}

/// Validate a username.
pub fn validate_username(username: &str, limits: &Limits) -> Result<(), ValidationError> {
    check_text("username", username, limits.max_username_len)
}

/// Validate an opaque key blob (public key or wrapped note key).
pub fn validate_key(field: &'static str, key: &Blob, limits: &Limits) -> Result<(), ValidationError> {
    check_blob(field, key, limits.max_blob_len)
}

fn validate_sealed(sealed: &SealedNote, limits: &Limits) -> Result<(), ValidationError> {
    check_blob("ciphertext", &sealed.ciphertext, limits.max_blob_len)?;
    check_blob("iv", &sealed.iv, limits.max_blob_len)?;
    check_blob("tag", &sealed.tag, limits.max_blob_len)
}

/// Validate the shape of a note write.
///
/// Checks:
/// - Declared version is at least 1 and fits a signed 64-bit column
/// - Ciphertext, IV and tag are present and within limits
/// - Wrapped key, if present, is non-empty and within limits
pub fn validate_payload(payload: &NotePayload, limits: &Limits) -> Result<(), ValidationError> {
    if payload.version == 0 {
        return Err(ValidationError::ZeroVersion(payload.version));
    }
    if payload.version > i64::MAX as u64 {
        return Err(ValidationError::VersionOutOfRange(payload.version));
    }
    validate_sealed(&payload.sealed, limits)?;
    if let Some(key) = &payload.wrapped_key {
        validate_key("wrapped_key", key, limits)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(version: u64) -> NotePayload {
        NotePayload::new(SealedNote::new("ct", "iv", "tag"), version)
    }

    #[test]
    fn test_valid_payload() {
        assert!(validate_payload(&payload(1), &Limits::default()).is_ok());
    }

    #[test]
    fn test_zero_version_rejected() {
        assert_eq!(
            validate_payload(&payload(0), &Limits::default()),
            Err(ValidationError::ZeroVersion(0))
        );
    }

    #[test]
    fn test_huge_version_rejected() {
        assert_eq!(
            validate_payload(&payload(u64::MAX), &Limits::default()),
            Err(ValidationError::VersionOutOfRange(u64::MAX))
        );
    }

    #[test]
    fn test_empty_tag_rejected() {
        let mut p = payload(1);
        p.sealed.tag = Blob::default();
        assert_eq!(
            validate_payload(&p, &Limits::default()),
            Err(ValidationError::Empty { field: "tag" })
        );
    }

    #[test]
    fn test_empty_wrapped_key_rejected() {
        let p = payload(1).with_wrapped_key(Blob::default());
        assert_eq!(
            validate_payload(&p, &Limits::default()),
            Err(ValidationError::Empty { field: "wrapped_key" })
        );
    }

    #[test]
    fn test_oversized_ciphertext_rejected() {
        let limits = Limits {
            max_blob_len: 4,
            ..Limits::default()
        };
        let p = NotePayload::new(SealedNote::new(vec![0u8; 5], "iv", "tag"), 1);
        assert_eq!(
            validate_payload(&p, &limits),
            Err(ValidationError::TooLong {
                field: "ciphertext",
                len: 5,
                max: 4
            })
        );
    }

    #[test]
    fn test_title_rules() {
        let limits = Limits::default();
        assert!(validate_title("groceries", &limits).is_ok());
        assert_eq!(
            validate_title("", &limits),
            Err(ValidationError::Empty { field: "title" })
        );
        assert_eq!(
            validate_title("a\nb", &limits),
            Err(ValidationError::ControlCharacters { field: "title" })
        );
        let long = "x".repeat(256);
        assert!(matches!(
            validate_title(&long, &limits),
            Err(ValidationError::TooLong { len: 256, .. })
        ));
    }

    #[test]
    fn test_username_rules() {
        let limits = Limits::default();
        assert!(validate_username("alice", &limits).is_ok());
        assert!(validate_username("", &limits).is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_title_accepted_iff_within_limit(title in "[a-z ]{1,64}", max in 1usize..64) {
                let limits = Limits { max_title_len: max, ..Limits::default() };
                let result = validate_title(&title, &limits);
                if title.len() <= max {
                    prop_assert!(result.is_ok());
                } else {
                    prop_assert_eq!(
                        result,
                        Err(ValidationError::TooLong { field: "title", len: title.len(), max })
                    );
                }
            }

            #[test]
            fn prop_blob_limit_applies_to_every_part(
                sizes in prop::array::uniform3(1usize..48),
                max in 1usize..48,
            ) {
                let sealed = SealedNote::new(vec![1u8; sizes[0]], vec![2u8; sizes[1]], vec![3u8; sizes[2]]);
                let limits = Limits { max_blob_len: max, ..Limits::default() };
                let result = validate_payload(&NotePayload::new(sealed, 1), &limits);
                prop_assert_eq!(result.is_ok(), sizes.iter().all(|&n| n <= max));
            }

            #[test]
            fn prop_versions_in_signed_range_accepted(version in 1u64..=i64::MAX as u64) {
                prop_assert!(validate_payload(&payload(version), &Limits::default()).is_ok());
            }
        }
    }
}
