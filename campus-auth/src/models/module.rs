//! Functional modules and per-module permission grants.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Role;

/// Functional areas permission is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Students,
    Attendance,
    Results,
    Exams,
    Timetable,
    Announcements,
    /// Programs & structure: degrees, branches, batches, sections.
    Programs,
}

impl Module {
    pub const ALL: [Module; 7] = [
        Module::Students,
        Module::Attendance,
        Module::Results,
        Module::Exams,
        Module::Timetable,
        Module::Announcements,
        Module::Programs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Students => "students",
            Module::Attendance => "attendance",
            Module::Results => "results",
            Module::Exams => "exams",
            Module::Timetable => "timetable",
            Module::Announcements => "announcements",
            Module::Programs => "programs",
        }
    }
}

impl std::str::FromStr for Module {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "students" => Ok(Module::Students),
            "attendance" => Ok(Module::Attendance),
            "results" => Ok(Module::Results),
            "exams" => Ok(Module::Exams),
            "timetable" => Ok(Module::Timetable),
            "announcements" => Ok(Module::Announcements),
            "programs" => Ok(Module::Programs),
            _ => Err(format!("Unknown module: {}", s)),
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested access kind for a module check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read,
    Write,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
        }
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breadth at which a module grant applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    All,
    Department,
    Own,
}

impl PermissionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionScope::All => "all",
            PermissionScope::Department => "department",
            PermissionScope::Own => "own",
        }
    }
}

impl std::str::FromStr for PermissionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(PermissionScope::All),
            "department" => Ok(PermissionScope::Department),
            "own" => Ok(PermissionScope::Own),
            _ => Err(format!("Unknown permission scope: {}", s)),
        }
    }
}

/// A single module grant held by an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ModulePermission {
    pub module: Module,
    pub can_read: bool,
    pub can_write: bool,
    pub scope: Option<PermissionScope>,
}

impl ModulePermission {
    /// The grants an account starts with at setup time, by role.
    pub fn defaults_for(role: Role) -> Vec<ModulePermission> {
        match role {
            Role::Principal | Role::CollegeAdmin => Module::ALL
                .iter()
                .map(|&module| ModulePermission {
                    module,
                    can_read: true,
                    can_write: true,
                    scope: Some(PermissionScope::All),
                })
                .collect(),
            Role::Hod => Module::ALL
                .iter()
                .map(|&module| ModulePermission {
                    module,
                    can_read: true,
                    can_write: true,
                    scope: Some(PermissionScope::Department),
                })
                .collect(),
            // Staff always keep read access to programs & structure; anything
            // more must be granted explicitly.
            Role::Staff => vec![ModulePermission {
                module: Module::Programs,
                can_read: true,
                can_write: false,
                scope: None,
            }],
        }
    }
}
