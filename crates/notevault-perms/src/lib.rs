//! # notevault Permissions
//!
//! The collaborator role model.
//!
//! ## Overview
//!
//! Every user's relationship to a note is one [`Collaborator`] row carrying
//! a [`Role`]. Capabilities are derived from the set of roles a user holds
//! on a note ([`RoleSet`]); there is no role hierarchy and no dynamic
//! dispatch.
//!
//! | Capability                  | Owner | Editor | Viewer |
//! |-----------------------------|:-----:|:------:|:------:|
//! | read                        |   x   |   x    |   x    |
//! | write new versions          |   x   |   x    |        |
//! | add collaborators           |   x   |        |        |
//!
//! A user with no row holds an empty `RoleSet`; every predicate is false.
//!
//! ## Usage
//!
//! ```rust
//! use notevault_perms::{Role, RoleSet};
//!
//! let roles = RoleSet::from_roles([Role::Editor]);
//! assert!(roles.can_write());
//! assert!(!roles.can_manage_collaborators());
//! ```

pub mod access;
pub mod collaborator;
pub mod error;
pub mod role;

pub use access::RoleSet;
pub use collaborator::{Collaborator, CollaboratorId};
pub use error::{PermsError, Result};
pub use role::Role;
