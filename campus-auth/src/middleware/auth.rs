//! The request authentication pipeline.
//!
//! Ordered steps over the request: extract bearer token, consult the
//! revocation blacklist, verify the token, load and validate the actor.
//! The first failing step terminates the request; route handlers then
//! dispatch authorization-engine checks against the attached actor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use campus_core::error::AppError;

use crate::models::AuthenticatedActor;
use crate::AppState;

/// The bearer token from an Authorization header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Middleware to require an authenticated actor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("missing bearer token")))?
        .to_string();

    // Revocation is checked before signature verification so a revoked
    // token is reported as revoked even when otherwise valid. Store errors
    // fail closed.
    let blacklisted = state
        .credentials
        .is_token_blacklisted(&token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Store error checking token blacklist");
            AppError::from(e)
        })?;

    if blacklisted {
        return Err(AppError::AuthError(anyhow::anyhow!(
            "token has been revoked"
        )));
    }

    let claims = state
        .jwt
        .verify_access_token(&token)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("invalid or expired token")))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("invalid token subject")))?;

    let record = state
        .directory
        .find_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Directory error loading actor");
            AppError::InternalError(e)
        })?
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("account not found")))?;

    let actor = AuthenticatedActor::from_record(record).map_err(|e| {
        tracing::warn!(user_id = %user_id, error = %e, "Rejecting invalid account record");
        AppError::AuthError(anyhow::anyhow!("account record invalid"))
    })?;

    // Both the raw claims and the validated actor are available to handlers
    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

/// Extractor for the authenticated actor attached by `auth_middleware`.
pub struct CurrentActor(pub AuthenticatedActor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .extensions
            .get::<AuthenticatedActor>()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "actor missing from request extensions; auth middleware not applied"
                ))
            })?;

        Ok(CurrentActor(actor.clone()))
    }
}
