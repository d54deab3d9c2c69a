use serde::Serialize;

use crate::users::model::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
}

/// Role required by the users API.
pub const PERMITTED_ROLE: Role = Role::User;

/// Every stored account currently holds the single `User` role.
pub fn roles_for(_user: &User) -> Vec<Role> {
    vec![Role::User]
}
