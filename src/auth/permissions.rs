//! Role to capability mapping.
//!
//! Capabilities are `<resource>:<action>` strings. The matrix is built once
//! at startup and never changes afterwards.

use std::collections::{BTreeSet, HashMap, HashSet};

pub const ADMIN_ROLE: &str = "admin";
pub const VETERINARIAN_ROLE: &str = "veterinario";
pub const OWNER_ROLE: &str = "propietario";
pub const EMPLOYEE_ROLE: &str = "empleado";

/// Reported in place of a listing for roles that hold every capability.
pub const WILDCARD: &str = "*";

pub mod capabilities {
    pub const HORSES_READ: &str = "horses:read";
    pub const HORSES_CREATE: &str = "horses:create";
    pub const HORSES_UPDATE: &str = "horses:update";
    pub const HORSES_DELETE: &str = "horses:delete";

    pub const ESTABLISHMENTS_READ: &str = "establishments:read";
    pub const ESTABLISHMENTS_CREATE: &str = "establishments:create";
    pub const ESTABLISHMENTS_UPDATE: &str = "establishments:update";
    pub const ESTABLISHMENTS_DELETE: &str = "establishments:delete";

    pub const EVENTS_READ: &str = "events:read";
    pub const EVENTS_CREATE: &str = "events:create";
    pub const EVENTS_UPDATE: &str = "events:update";
    pub const EVENTS_DELETE: &str = "events:delete";

    pub const TASKS_READ: &str = "tasks:read";
    pub const TASKS_CREATE: &str = "tasks:create";
    pub const TASKS_UPDATE: &str = "tasks:update";
    pub const TASKS_DELETE: &str = "tasks:delete";

    pub const USERS_READ: &str = "users:read";
    pub const USERS_MANAGE: &str = "users:manage";

    pub const SYSTEM_MANAGE: &str = "system:manage";
}

use capabilities::*;

const READ_ALL: &[&str] = &[HORSES_READ, ESTABLISHMENTS_READ, EVENTS_READ, TASKS_READ];

#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    grants: HashMap<String, HashSet<String>>,
    wildcard_roles: HashSet<String>,
}

impl PermissionMatrix {
    /// An empty matrix: every check is denied.
    pub fn empty() -> Self {
        Self {
            grants: HashMap::new(),
            wildcard_roles: HashSet::new(),
        }
    }

    pub fn with_role(mut self, role: &str, granted: &[&str]) -> Self {
        self.grants
            .entry(role.to_string())
            .or_default()
            .extend(granted.iter().map(|p| p.to_string()));
        self
    }

    /// Marks `role` as satisfying every capability check.
    pub fn with_wildcard_role(mut self, role: &str) -> Self {
        self.wildcard_roles.insert(role.to_string());
        self.grants.entry(role.to_string()).or_default();
        self
    }

    /// The stable management roles.
    pub fn standard() -> Self {
        Self::empty()
            .with_wildcard_role(ADMIN_ROLE)
            .with_role(VETERINARIAN_ROLE, READ_ALL)
            .with_role(
                VETERINARIAN_ROLE,
                &[
                    HORSES_CREATE,
                    HORSES_UPDATE,
                    EVENTS_CREATE,
                    EVENTS_UPDATE,
                    TASKS_CREATE,
                    TASKS_UPDATE,
                ],
            )
            .with_role(OWNER_ROLE, READ_ALL)
            .with_role(
                OWNER_ROLE,
                &[
                    HORSES_CREATE,
                    HORSES_UPDATE,
                    HORSES_DELETE,
                    ESTABLISHMENTS_CREATE,
                    ESTABLISHMENTS_UPDATE,
                    ESTABLISHMENTS_DELETE,
                    EVENTS_CREATE,
                    EVENTS_UPDATE,
                    TASKS_CREATE,
                    TASKS_UPDATE,
                ],
            )
            .with_role(EMPLOYEE_ROLE, READ_ALL)
            .with_role(EMPLOYEE_ROLE, &[TASKS_UPDATE])
    }

    pub fn is_known_role(&self, role: &str) -> bool {
        self.grants.contains_key(role)
    }

    pub fn is_wildcard(&self, role: &str) -> bool {
        self.wildcard_roles.contains(role)
    }

    /// Capabilities listed for `role`, sorted. Unknown roles get nothing.
    pub fn permissions_for(&self, role: &str) -> BTreeSet<&str> {
        if self.is_wildcard(role) {
            return BTreeSet::from([WILDCARD]);
        }
        self.grants
            .get(role)
            .map(|granted| granted.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_permission(&self, role: &str, permission: &str) -> bool {
        if self.is_wildcard(role) {
            return true;
        }
        self.grants
            .get(role)
            .is_some_and(|granted| granted.contains(permission))
    }

    pub fn has_role(&self, role: &str, allowed: &[&str]) -> bool {
        self.is_known_role(role) && allowed.contains(&role)
    }
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_satisfies_everything() {
        let matrix = PermissionMatrix::standard();
        assert!(matrix.has_permission(ADMIN_ROLE, HORSES_DELETE));
        assert!(matrix.has_permission(ADMIN_ROLE, SYSTEM_MANAGE));
        // including capabilities nobody ever listed
        assert!(matrix.has_permission(ADMIN_ROLE, "billing:refund"));
        assert_eq!(matrix.permissions_for(ADMIN_ROLE), BTreeSet::from([WILDCARD]));
    }

    #[test]
    fn test_veterinarian_grants() {
        let matrix = PermissionMatrix::standard();
        assert!(matrix.has_permission(VETERINARIAN_ROLE, HORSES_READ));
        assert!(matrix.has_permission(VETERINARIAN_ROLE, EVENTS_CREATE));
        assert!(!matrix.has_permission(VETERINARIAN_ROLE, HORSES_DELETE));
        assert!(!matrix.has_permission(VETERINARIAN_ROLE, USERS_MANAGE));
        assert!(!matrix.has_permission(VETERINARIAN_ROLE, SYSTEM_MANAGE));
    }

    #[test]
    fn test_employee_is_mostly_read_only() {
        let matrix = PermissionMatrix::standard();
        let granted = matrix.permissions_for(EMPLOYEE_ROLE);
        assert!(granted.contains(TASKS_UPDATE));
        assert!(granted.iter().all(|p| p.ends_with(":read") || *p == TASKS_UPDATE));
    }

    #[test]
    fn test_unknown_role_fails_closed() {
        let matrix = PermissionMatrix::standard();
        assert!(matrix.permissions_for("superuser").is_empty());
        assert!(!matrix.has_permission("superuser", HORSES_READ));
        assert!(!matrix.has_permission("", HORSES_READ));
        assert!(!matrix.has_role("superuser", &["superuser"]));
    }

    #[test]
    fn test_wildcard_is_not_a_grantable_string() {
        let matrix = PermissionMatrix::standard();
        assert!(!matrix.has_permission(OWNER_ROLE, WILDCARD));
    }

    #[test]
    fn test_has_role() {
        let matrix = PermissionMatrix::standard();
        assert!(matrix.has_role(OWNER_ROLE, &[OWNER_ROLE, ADMIN_ROLE]));
        assert!(!matrix.has_role(EMPLOYEE_ROLE, &[OWNER_ROLE, ADMIN_ROLE]));
    }

    #[test]
    fn test_custom_matrix() {
        let matrix = PermissionMatrix::empty().with_role("auditor", &[USERS_READ]);
        assert!(matrix.has_permission("auditor", USERS_READ));
        assert!(!matrix.has_permission(ADMIN_ROLE, USERS_READ));
    }
}
