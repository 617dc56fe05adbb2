//! Calendar scopes and the static per-role calendar permission table.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Role;

/// Breadth of an academic calendar entry.
///
/// Scopes nest conceptually (college ⊇ department ⊇ degree ⊇ branch ⊇
/// batch ⊇ section) but the engine never computes containment; it consults
/// the static per-role table below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CalendarScope {
    College,
    Department,
    Degree,
    Branch,
    Batch,
    Section,
}

impl Default for CalendarScope {
    fn default() -> Self {
        CalendarScope::College
    }
}

impl CalendarScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarScope::College => "college",
            CalendarScope::Department => "department",
            CalendarScope::Degree => "degree",
            CalendarScope::Branch => "branch",
            CalendarScope::Batch => "batch",
            CalendarScope::Section => "section",
        }
    }
}

impl std::fmt::Display for CalendarScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CalendarAction {
    Create,
    Edit,
    Delete,
}

impl CalendarAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarAction::Create => "create",
            CalendarAction::Edit => "edit",
            CalendarAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for CalendarAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALL_SCOPES: &[CalendarScope] = &[
    CalendarScope::College,
    CalendarScope::Department,
    CalendarScope::Degree,
    CalendarScope::Branch,
    CalendarScope::Batch,
    CalendarScope::Section,
];

const SUB_COLLEGE_SCOPES: &[CalendarScope] = &[
    CalendarScope::Department,
    CalendarScope::Degree,
    CalendarScope::Branch,
    CalendarScope::Batch,
    CalendarScope::Section,
];

const NO_SCOPES: &[CalendarScope] = &[];

/// Per-role calendar permission table. Static configuration, safe for
/// concurrent reads.
#[derive(Debug, Clone, Copy)]
pub struct CalendarPermissions {
    pub can_create: &'static [CalendarScope],
    pub can_edit: &'static [CalendarScope],
    pub can_delete: &'static [CalendarScope],
}

impl CalendarPermissions {
    pub fn for_role(role: Role) -> CalendarPermissions {
        match role {
            Role::Principal | Role::CollegeAdmin => CalendarPermissions {
                can_create: ALL_SCOPES,
                can_edit: ALL_SCOPES,
                can_delete: ALL_SCOPES,
            },
            Role::Hod => CalendarPermissions {
                can_create: SUB_COLLEGE_SCOPES,
                can_edit: SUB_COLLEGE_SCOPES,
                can_delete: SUB_COLLEGE_SCOPES,
            },
            // Staff get calendar access through module permissions, never
            // through the calendar table.
            Role::Staff => CalendarPermissions {
                can_create: NO_SCOPES,
                can_edit: NO_SCOPES,
                can_delete: NO_SCOPES,
            },
        }
    }

    pub fn allows(&self, action: CalendarAction, scope: CalendarScope) -> bool {
        let scopes = match action {
            CalendarAction::Create => self.can_create,
            CalendarAction::Edit => self.can_edit,
            CalendarAction::Delete => self.can_delete,
        };
        scopes.contains(&scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_roles_get_every_scope_for_every_action() {
        for role in [Role::Principal, Role::CollegeAdmin] {
            let perms = CalendarPermissions::for_role(role);
            for &scope in ALL_SCOPES {
                for action in [
                    CalendarAction::Create,
                    CalendarAction::Edit,
                    CalendarAction::Delete,
                ] {
                    assert!(perms.allows(action, scope), "{role} {action} {scope}");
                }
            }
        }
    }

    #[test]
    fn hod_gets_everything_below_college() {
        let perms = CalendarPermissions::for_role(Role::Hod);
        assert!(!perms.allows(CalendarAction::Create, CalendarScope::College));
        assert!(!perms.allows(CalendarAction::Delete, CalendarScope::College));
        assert!(perms.allows(CalendarAction::Create, CalendarScope::Department));
        assert!(perms.allows(CalendarAction::Edit, CalendarScope::Section));
    }

    #[test]
    fn staff_table_is_empty() {
        let perms = CalendarPermissions::for_role(Role::Staff);
        for &scope in ALL_SCOPES {
            assert!(!perms.allows(CalendarAction::Create, scope));
            assert!(!perms.allows(CalendarAction::Edit, scope));
            assert!(!perms.allows(CalendarAction::Delete, scope));
        }
    }

    #[test]
    fn default_scope_is_college() {
        assert_eq!(CalendarScope::default(), CalendarScope::College);
    }
}
