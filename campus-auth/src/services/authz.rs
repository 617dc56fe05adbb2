//! Authorization engine.
//!
//! Stateless decision functions combining an authenticated actor with the
//! static permission catalog. Every function is deny-by-default: absence of
//! an explicit grant is a deny, never inferred as an allow.

use thiserror::Error;
use uuid::Uuid;

use campus_core::error::AppError;

use crate::models::{
    Access, AuthenticatedActor, CalendarAction, CalendarPermissions, CalendarScope, Module, Role,
};

/// A denied authorization decision, with the reason surfaced to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("insufficient role")]
    InsufficientRole,

    #[error("no access to {0} module")]
    NoModuleAccess(Module),

    #[error("insufficient {access} permission for {module} module")]
    InsufficientModulePermission { module: Module, access: Access },

    #[error("access restricted to own department")]
    DepartmentMismatch,

    #[error("insufficient permissions")]
    InsufficientPermissions,

    #[error("calendar {action} not permitted at {scope} scope")]
    CalendarDenied {
        action: CalendarAction,
        scope: CalendarScope,
    },

    #[error("academic data access denied")]
    AcademicAccessDenied,
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        AppError::Forbidden(anyhow::anyhow!(err.to_string()))
    }
}

/// Allow iff the actor's role is one of `allowed`.
pub fn check_role(actor: &AuthenticatedActor, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole)
    }
}

/// Allow iff the actor holds a grant for `module` with the requested access
/// flag set. Principal and college admin bypass the grant table.
pub fn check_module_permission(
    actor: &AuthenticatedActor,
    module: Module,
    access: Access,
) -> Result<(), AuthzError> {
    if matches!(actor.role, Role::Principal | Role::CollegeAdmin) {
        return Ok(());
    }

    let perm = actor
        .module_permission(module)
        .ok_or(AuthzError::NoModuleAccess(module))?;

    let allowed = match access {
        Access::Read => perm.can_read,
        Access::Write => perm.can_write,
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthzError::InsufficientModulePermission { module, access })
    }
}

/// Allow iff the actor may touch data belonging to `target_department`.
///
/// A HOD must name a target and it must be their own department; staff may
/// omit the target (non-departmental data) or match their own department.
pub fn check_department_access(
    actor: &AuthenticatedActor,
    target_department: Option<Uuid>,
) -> Result<(), AuthzError> {
    match actor.role {
        Role::Principal | Role::CollegeAdmin => Ok(()),
        Role::Hod => {
            if target_department.is_some() && target_department == actor.department_id {
                Ok(())
            } else {
                Err(AuthzError::DepartmentMismatch)
            }
        }
        Role::Staff => {
            if target_department.is_none() || target_department == actor.department_id {
                Ok(())
            } else {
                Err(AuthzError::DepartmentMismatch)
            }
        }
    }
}

/// Whether `role`, belonging to `own_department`, may manage a staff account
/// in `target_department`.
pub fn can_manage_staff(
    role: Role,
    own_department: Option<Uuid>,
    target_department: Option<Uuid>,
) -> bool {
    match role {
        Role::Principal | Role::CollegeAdmin => true,
        Role::Hod => own_department.is_some() && own_department == target_department,
        Role::Staff => false,
    }
}

/// Allow iff the actor may manage the account whose department is
/// `target_department`.
pub fn check_user_management(
    actor: &AuthenticatedActor,
    target_department: Option<Uuid>,
) -> Result<(), AuthzError> {
    if can_manage_staff(actor.role, actor.department_id, target_department) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientPermissions)
    }
}

/// Allow iff the static calendar table permits `action` at `scope` for the
/// actor's role. A HOD acting at department scope with a supplied
/// `scope_department` must additionally match their own department; a
/// mismatch overrides the table.
pub fn check_calendar_permission(
    actor: &AuthenticatedActor,
    action: CalendarAction,
    scope: CalendarScope,
    scope_department: Option<Uuid>,
) -> Result<(), AuthzError> {
    if !CalendarPermissions::for_role(actor.role).allows(action, scope) {
        return Err(AuthzError::CalendarDenied { action, scope });
    }

    if actor.role == Role::Hod
        && scope == CalendarScope::Department
        && scope_department.is_some()
        && scope_department != actor.department_id
    {
        return Err(AuthzError::DepartmentMismatch);
    }

    Ok(())
}

/// Allow iff the actor may read academic data (programs, branches, batches)
/// for `target_department`.
pub fn can_access_academic_data(
    actor: &AuthenticatedActor,
    target_department: Option<Uuid>,
    target_branch: Option<Uuid>,
) -> Result<(), AuthzError> {
    match actor.role {
        Role::Principal | Role::CollegeAdmin => Ok(()),
        Role::Hod => {
            if target_department.is_none() || target_department == actor.department_id {
                Ok(())
            } else {
                tracing::trace!(
                    user_id = %actor.user_id,
                    ?target_department,
                    ?target_branch,
                    "academic data access denied"
                );
                Err(AuthzError::AcademicAccessDenied)
            }
        }
        Role::Staff => match actor.department_id {
            // Non-departmental staff fall back to the programs module grant.
            None => check_module_permission(actor, Module::Programs, Access::Read)
                .map_err(|_| AuthzError::AcademicAccessDenied),
            Some(own) => {
                if target_department.is_none() || target_department == Some(own) {
                    Ok(())
                } else {
                    Err(AuthzError::AcademicAccessDenied)
                }
            }
        },
    }
}
