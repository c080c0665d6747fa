//! Role-based access policy
//!
//! The policy is fixed at compile time:
//!
//! | Permission | admin | editor | user |
//! |------------|:-----:|:------:|:----:|
//! | `can_manage_users` | ✓ | | |
//! | `can_manage_settings` | ✓ | | |
//! | `can_view_analytics` | ✓ | ✓ | |
//! | `can_publish_content` | ✓ | ✓ | |
//! | `can_edit_content` | ✓ | ✓ | |
//! | `can_manage_media` | ✓ | ✓ | |
//! | `can_view_dashboard` | ✓ | ✓ | ✓ |
//! | `can_edit_profile` | ✓ | ✓ | ✓ |

use crate::permission::Permission;
use crate::role::Role;

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ManageUsers,
    Permission::ManageSettings,
    Permission::ViewAnalytics,
    Permission::PublishContent,
    Permission::EditContent,
    Permission::ManageMedia,
    Permission::ViewDashboard,
    Permission::EditProfile,
];

const EDITOR_PERMISSIONS: &[Permission] = &[
    Permission::ViewAnalytics,
    Permission::PublishContent,
    Permission::EditContent,
    Permission::ManageMedia,
    Permission::ViewDashboard,
    Permission::EditProfile,
];

const USER_PERMISSIONS: &[Permission] = &[Permission::ViewDashboard, Permission::EditProfile];

/// Permissions granted to `role`.
#[inline]
pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => ADMIN_PERMISSIONS,
        Role::Editor => EDITOR_PERMISSIONS,
        Role::User => USER_PERMISSIONS,
    }
}

/// Permissions for a raw role name; unknown names get none.
pub fn permissions_for_name(name: &str) -> &'static [Permission] {
    match name.parse::<Role>() {
        Ok(role) => permissions_for(role),
        Err(_) => {
            log::debug!("[RBAC] No permissions for unknown role '{}'", name);
            &[]
        },
    }
}

/// Check if `role` is granted `permission`.
#[inline]
pub fn role_grants(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_every_permission() {
        for p in Permission::ALL {
            assert!(role_grants(Role::Admin, p), "admin lacks {}", p);
        }
    }

    #[test]
    fn test_policy_table() {
        let expected: &[(Permission, [bool; 3])] = &[
            (Permission::ManageUsers, [true, false, false]),
            (Permission::ManageSettings, [true, false, false]),
            (Permission::ViewAnalytics, [true, true, false]),
            (Permission::PublishContent, [true, true, false]),
            (Permission::EditContent, [true, true, false]),
            (Permission::ManageMedia, [true, true, false]),
            (Permission::ViewDashboard, [true, true, true]),
            (Permission::EditProfile, [true, true, true]),
        ];
        for (permission, grants) in expected {
            for (role, granted) in Role::ALL.iter().zip(grants) {
                assert_eq!(role_grants(*role, *permission), *granted, "{} / {}", role, permission);
            }
        }
    }

    #[test]
    fn test_unknown_name_has_no_permissions() {
        assert!(permissions_for_name("superuser").is_empty());
        assert!(permissions_for_name("").is_empty());
        assert_eq!(permissions_for_name("user"), permissions_for(Role::User));
    }
}
