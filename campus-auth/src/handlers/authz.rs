//! The authorization decision contract, surfaced over HTTP.
//!
//! Runs a single engine check against the calling actor and reports the
//! decision. A deny here is a normal outcome, returned in the body rather
//! than as an HTTP error.

use axum::extract::{Json, State};

use campus_core::error::AppError;

use crate::dtos::authz::{AuthzCheckRequest, AuthzCheckResponse};
use crate::dtos::ErrorResponse;
use crate::middleware::CurrentActor;
use crate::services::authz;
use crate::AppState;

/// Evaluate one authorization check for the calling actor
#[utoipa::path(
    post,
    path = "/authz/check",
    request_body = AuthzCheckRequest,
    responses(
        (status = 200, description = "Decision", body = AuthzCheckResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Authorization"
)]
#[tracing::instrument(skip(state, actor, req), fields(user_id = %actor.user_id))]
pub async fn check(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(req): Json<AuthzCheckRequest>,
) -> Result<Json<AuthzCheckResponse>, AppError> {
    let decision = match req {
        AuthzCheckRequest::Role { allowed } => authz::check_role(&actor, &allowed),
        AuthzCheckRequest::Module { module, access } => {
            authz::check_module_permission(&actor, module, access)
        }
        AuthzCheckRequest::Department { department_id } => {
            authz::check_department_access(&actor, department_id)
        }
        AuthzCheckRequest::UserManagement { target_user_id } => {
            let target = state
                .directory
                .find_by_id(target_user_id)
                .await
                .map_err(AppError::InternalError)?;

            match target {
                Some(target) => authz::check_user_management(&actor, target.department_id),
                // An unresolvable target is a deny, not an error.
                None => {
                    return Ok(Json(AuthzCheckResponse {
                        allowed: false,
                        reason: Some("target user not found".to_string()),
                    }))
                }
            }
        }
        AuthzCheckRequest::Calendar {
            action,
            scope,
            department_id,
        } => authz::check_calendar_permission(&actor, action, scope, department_id),
        AuthzCheckRequest::AcademicData {
            department_id,
            branch_id,
        } => authz::can_access_academic_data(&actor, department_id, branch_id),
    };

    let response = match decision {
        Ok(()) => AuthzCheckResponse {
            allowed: true,
            reason: None,
        },
        Err(deny) => AuthzCheckResponse {
            allowed: false,
            reason: Some(deny.to_string()),
        },
    };

    Ok(Json(response))
}
