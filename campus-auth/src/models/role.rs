//! Role catalog - the ordered role hierarchy of a college.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Staff roles, ordered by authority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Principal,
    CollegeAdmin,
    Hod,
    Staff,
}

impl Role {
    /// Authority level; a higher level strictly dominates a lower one.
    pub fn level(&self) -> u8 {
        match self {
            Role::Principal => 4,
            Role::CollegeAdmin => 3,
            Role::Hod => 2,
            Role::Staff => 1,
        }
    }

    /// Whether this role may manage accounts holding `other`.
    ///
    /// Irreflexive: a role never manages an equal role.
    pub fn manages(&self, other: Role) -> bool {
        self.level() > other.level()
    }

    /// Whether an account with this role must belong to a department.
    pub fn requires_department(&self) -> bool {
        matches!(self, Role::Hod)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Principal => "principal",
            Role::CollegeAdmin => "college_admin",
            Role::Hod => "hod",
            Role::Staff => "staff",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "principal" => Ok(Role::Principal),
            "college_admin" => Ok(Role::CollegeAdmin),
            "hod" => Ok(Role::Hod),
            "staff" => Ok(Role::Staff),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        assert!(Role::Principal.level() > Role::CollegeAdmin.level());
        assert!(Role::CollegeAdmin.level() > Role::Hod.level());
        assert!(Role::Hod.level() > Role::Staff.level());
    }

    #[test]
    fn manages_follows_strict_level_order() {
        let roles = [Role::Principal, Role::CollegeAdmin, Role::Hod, Role::Staff];
        for a in roles {
            for b in roles {
                assert_eq!(a.manages(b), a.level() > b.level());
            }
        }

        assert!(Role::Principal.manages(Role::Hod));
        assert!(!Role::Hod.manages(Role::Principal));
        assert!(!Role::Staff.manages(Role::Staff));
    }

    #[test]
    fn only_hod_requires_department() {
        assert!(Role::Hod.requires_department());
        assert!(!Role::Principal.requires_department());
        assert!(!Role::CollegeAdmin.requires_department());
        assert!(!Role::Staff.requires_department());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Principal, Role::CollegeAdmin, Role::Hod, Role::Staff] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("registrar".parse::<Role>().is_err());
    }
}
