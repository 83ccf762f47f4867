//! The fixed set of collaborator roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PermsError, Result};

/// A user's role on a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Created the note. Exactly one per note, never granted later.
    Owner,
    /// May append new versions.
    Editor,
    /// May read.
    Viewer,
}

impl Role {
    /// All roles, in storage order.
    pub const ALL: [Role; 3] = [Role::Owner, Role::Editor, Role::Viewer];

    /// Textual form used in storage and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    /// Whether an owner may hand this role to another user.
    ///
    /// Ownership only comes from creating the note.
    pub const fn is_grantable(self) -> bool {
        matches!(self, Role::Editor | Role::Viewer)
    }

    /// Fails with [`PermsError::NotGrantable`] for `Owner`.
    pub fn ensure_grantable(self) -> Result<Self> {
        if self.is_grantable() {
            Ok(self)
        } else {
            Err(PermsError::NotGrantable(self))
        }
    }

    pub(crate) const fn bit(self) -> u8 {
        match self {
            Role::Owner => 0b001,
            Role::Editor => 0b010,
            Role::Viewer => 0b100,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PermsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "owner" => Ok(Role::Owner),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            other => Err(PermsError::UnknownRole(other.to_string())),
        }
    }
}
