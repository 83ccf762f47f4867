//! Error types for the test client.

use thiserror::Error;

/// Errors from client-side sealing and key wrapping.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A key had the wrong length.
    #[error("invalid key length: {0} bytes")]
    InvalidKey(usize),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
