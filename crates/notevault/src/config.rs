//! Vault configuration.

use notevault_core::Limits;
use serde::{Deserialize, Serialize};

/// Configuration for the Vault.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use notevault::VaultConfig;
///
/// let config = VaultConfig::from_json(r#"{ "allow_version_gaps": true }"#).unwrap();
/// assert!(config.allow_version_gaps);
/// assert_eq!(config.max_title_len, 255);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Store a declared version more than one ahead of the latest as-is
    /// instead of failing with `VersionGap`.
    pub allow_version_gaps: bool,

    /// Fail a same-version replay whose bytes differ from the stored latest
    /// with `StaleVersion`. When off, such a replay is a no-op and only logged.
    pub reject_divergent_replays: bool,

    /// Maximum note title length in bytes.
    pub max_title_len: usize,

    /// Maximum size of a ciphertext, IV, tag or key in bytes.
    pub max_blob_len: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            allow_version_gaps: false,
            reject_divergent_replays: true,
            max_title_len: limits.max_title_len,
            max_blob_len: limits.max_blob_len,
        }
    }
}

impl VaultConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Input limits derived from this configuration.
    pub fn limits(&self) -> Limits {
        Limits {
            max_title_len: self.max_title_len,
            max_blob_len: self.max_blob_len,
            ..Limits::default()
        }
    }
}
