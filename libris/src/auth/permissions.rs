use super::models::Role;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Wildcard entry granting every permission to a role.
pub const WILDCARD: &str = "*";

/// Role to permission mapping. Plain data, so deployments can load their own
/// table from configuration instead of patching code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionTable {
    grants: HashMap<Role, HashSet<String>>,
}

impl Default for PermissionTable {
    /// The built-in table: admins hold the wildcard, librarians run the
    /// collection, users act on their own account.
    fn default() -> Self {
        let mut grants: HashMap<Role, HashSet<String>> = HashMap::new();

        grants.insert(Role::Admin, [WILDCARD].iter().map(|s| s.to_string()).collect());
        grants.insert(
            Role::Librarian,
            [
                "manage_books",
                "manage_loans",
                "manage_reservations",
                "view_reports",
                "manage_users_basic",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        grants.insert(
            Role::User,
            [
                "view_books",
                "borrow_books",
                "reserve_books",
                "manage_profile",
                "write_reviews",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );

        Self { grants }
    }
}

impl PermissionTable {
    pub fn new(grants: HashMap<Role, HashSet<String>>) -> Self {
        Self { grants }
    }

    /// Whether `role` holds `permission`, either directly or via wildcard.
    /// A role missing from the table holds nothing.
    pub fn allows(&self, role: Role, permission: &str) -> bool {
        match self.grants.get(&role) {
            Some(granted) => granted.contains(WILDCARD) || granted.contains(permission),
            None => false,
        }
    }

    pub fn grants_for(&self, role: Role) -> Option<&HashSet<String>> {
        self.grants.get(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_wildcard_covers_anything() {
        let table = PermissionTable::default();
        assert!(table.allows(Role::Admin, "manage_books"));
        assert!(table.allows(Role::Admin, "some_future_permission"));
    }

    #[test]
    fn test_librarian_and_user_grants() {
        let table = PermissionTable::default();
        assert!(table.allows(Role::Librarian, "manage_loans"));
        assert!(table.allows(Role::Librarian, "view_reports"));
        assert!(!table.allows(Role::Librarian, "borrow_books"));

        assert!(table.allows(Role::User, "borrow_books"));
        assert!(table.allows(Role::User, "write_reviews"));
        assert!(!table.allows(Role::User, "manage_books"));
    }

    #[test]
    fn test_unknown_permission_is_denied() {
        let table = PermissionTable::default();
        assert!(!table.allows(Role::User, "launch_missiles"));
        assert!(!table.allows(Role::Librarian, "launch_missiles"));
    }

    #[test]
    fn test_role_missing_from_custom_table_holds_nothing() {
        let mut grants = HashMap::new();
        grants.insert(
            Role::Admin,
            [WILDCARD.to_string()].into_iter().collect::<HashSet<_>>(),
        );
        let table = PermissionTable::new(grants);
        assert!(table.allows(Role::Admin, "anything"));
        assert!(!table.allows(Role::User, "view_books"));
    }

    #[test]
    fn test_table_round_trips_through_json() {
        let table = PermissionTable::default();
        let json = serde_json::to_string(&table).unwrap();
        let loaded: PermissionTable = serde_json::from_str(&json).unwrap();
        assert!(loaded.allows(Role::User, "manage_profile"));
        assert!(!loaded.allows(Role::User, "manage_books"));
    }
}
