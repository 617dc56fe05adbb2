//! The authenticated actor attached to a request.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::{Module, ModulePermission, Role};

/// Raw account record as loaded from the directory.
#[derive(Debug, Clone)]
pub struct ActorRecord {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub college_id: Uuid,
    pub module_permissions: Vec<ModulePermission>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActorError {
    #[error("duplicate permission grant for {0} module")]
    DuplicateModuleGrant(Module),

    #[error("{0} account has no department")]
    MissingDepartment(Role),
}

/// An authenticated identity, validated once at construction and immutable
/// for the lifetime of the request. The authorization engine relies on the
/// validation here and performs no defensive checks of its own.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedActor {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub college_id: Uuid,
    pub module_permissions: Vec<ModulePermission>,
}

impl AuthenticatedActor {
    /// Validate a directory record into an actor.
    ///
    /// Rejects duplicate grants for the same module and a
    /// department-requiring role without a department.
    pub fn from_record(record: ActorRecord) -> Result<Self, ActorError> {
        if record.role.requires_department() && record.department_id.is_none() {
            return Err(ActorError::MissingDepartment(record.role));
        }

        let mut seen: HashSet<Module> = HashSet::new();
        for perm in &record.module_permissions {
            if !seen.insert(perm.module) {
                return Err(ActorError::DuplicateModuleGrant(perm.module));
            }
        }

        Ok(Self {
            user_id: record.user_id,
            email: record.email,
            role: record.role,
            department_id: record.department_id,
            college_id: record.college_id,
            module_permissions: record.module_permissions,
        })
    }

    /// The actor's grant for `module`, if any.
    pub fn module_permission(&self, module: Module) -> Option<&ModulePermission> {
        self.module_permissions.iter().find(|p| p.module == module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: Role, department_id: Option<Uuid>) -> ActorRecord {
        ActorRecord {
            user_id: Uuid::new_v4(),
            email: "someone@college.edu".to_string(),
            role,
            department_id,
            college_id: Uuid::new_v4(),
            module_permissions: ModulePermission::defaults_for(role),
        }
    }

    #[test]
    fn valid_record_becomes_an_actor() {
        let actor = AuthenticatedActor::from_record(record(Role::Staff, None)).unwrap();
        assert_eq!(actor.role, Role::Staff);
        assert!(actor.module_permission(Module::Programs).is_some());
        assert!(actor.module_permission(Module::Students).is_none());
    }

    #[test]
    fn hod_without_department_is_rejected() {
        let err = AuthenticatedActor::from_record(record(Role::Hod, None)).unwrap_err();
        assert_eq!(err, ActorError::MissingDepartment(Role::Hod));

        assert!(AuthenticatedActor::from_record(record(Role::Hod, Some(Uuid::new_v4()))).is_ok());
    }

    #[test]
    fn duplicate_module_grants_are_rejected() {
        let mut rec = record(Role::Staff, None);
        rec.module_permissions.push(ModulePermission {
            module: Module::Programs,
            can_read: true,
            can_write: true,
            scope: None,
        });

        let err = AuthenticatedActor::from_record(rec).unwrap_err();
        assert_eq!(err, ActorError::DuplicateModuleGrant(Module::Programs));
    }
}
