use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Access, CalendarAction, CalendarScope, Module, Role};

/// One authorization-engine check, dispatched against the calling actor.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum AuthzCheckRequest {
    Role {
        allowed: Vec<Role>,
    },
    Module {
        module: Module,
        access: Access,
    },
    Department {
        department_id: Option<Uuid>,
    },
    UserManagement {
        target_user_id: Uuid,
    },
    Calendar {
        action: CalendarAction,
        #[serde(default)]
        scope: CalendarScope,
        department_id: Option<Uuid>,
    },
    AcademicData {
        department_id: Option<Uuid>,
        branch_id: Option<Uuid>,
    },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthzCheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
