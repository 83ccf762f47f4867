//! Role membership and the capabilities derived from it.

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// The roles one user holds on one note.
///
/// Built from that user's collaborator rows for the note. The data model
/// allows at most one row per (note, user), but the predicates do not rely
/// on it: each capability is a disjunction over exact role membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleSet(u8);

impl RoleSet {
    /// No roles: the user is not a collaborator.
    pub const EMPTY: Self = Self(0);

    /// Build from an iterator of roles.
    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        roles.into_iter().collect()
    }

    /// Add a role.
    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    /// True iff a collaborator row with exactly this role exists.
    pub const fn has_role(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    /// Whether the user holds no role at all.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_owner(&self) -> bool {
        self.has_role(Role::Owner)
    }

    pub const fn is_editor(&self) -> bool {
        self.has_role(Role::Editor)
    }

    pub const fn is_viewer(&self) -> bool {
        self.has_role(Role::Viewer)
    }

    /// Owner or editor.
    pub const fn can_write(&self) -> bool {
        self.is_owner() || self.is_editor()
    }

    /// Owner, editor or viewer.
    pub const fn can_read(&self) -> bool {
        self.is_owner() || self.is_editor() || self.is_viewer()
    }

    /// Owner only.
    pub const fn can_manage_collaborators(&self) -> bool {
        self.is_owner()
    }

    /// Editor or viewer, i.e. already shared with. Owners are not counted.
    pub const fn is_shared_collaborator(&self) -> bool {
        self.is_editor() || self.is_viewer()
    }

    /// Iterate over held roles, strongest first.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|r| self.has_role(*r))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::EMPTY;
        for role in iter {
            set.insert(role);
        }
        set
    }
}
