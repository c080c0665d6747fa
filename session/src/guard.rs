use crate::{permission::Permission, rbac, role::Role};

/// Permission and role checks for one resolved (or absent) role.
///
/// An absent role passes no check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessGuard {
    role: Option<Role>,
}

impl AccessGuard {
    pub fn new(role: Option<Role>) -> Self {
        Self { role }
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.is_some_and(|role| rbac::role_grants(role, permission))
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    /// False for an empty `roles` list.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role.is_some_and(|role| roles.contains(&role))
    }

    /// Everything the role is granted; empty when absent.
    pub fn permissions(&self) -> &'static [Permission] {
        self.role.map(rbac::permissions_for).unwrap_or(&[])
    }
}

impl From<Option<Role>> for AccessGuard {
    fn from(role: Option<Role>) -> Self {
        Self::new(role)
    }
}
