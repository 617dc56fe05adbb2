//! Credential lifecycle endpoints: OTP sign-in, logout, introspection.

use axum::{
    extract::{Json, State},
    http::HeaderMap,
    Extension,
};
use chrono::Utc;
use rand::Rng;
use validator::Validate;

use campus_core::error::AppError;

use crate::dtos::auth::{
    IntrospectRequest, IntrospectResponse, LogoutResponse, RequestOtp, RequestOtpResponse,
    VerifyOtp,
};
use crate::dtos::ErrorResponse;
use crate::middleware::bearer_token;
use crate::models::AuthenticatedActor;
use crate::services::{AccessTokenClaims, TokenResponse};
use crate::AppState;

/// Request a one-time sign-in code
///
/// Issues a fresh code for the address, superseding any outstanding one,
/// and delivers it by email.
#[utoipa::path(
    post,
    path = "/auth/otp/request",
    request_body = RequestOtp,
    responses(
        (status = 200, description = "Code issued and sent", body = RequestOtpResponse),
        (status = 404, description = "No account for this email", body = ErrorResponse),
        (status = 429, description = "Too many code requests", body = ErrorResponse),
    ),
    tag = "Authentication"
)]
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(req): Json<RequestOtp>,
) -> Result<Json<RequestOtpResponse>, AppError> {
    req.validate()?;

    // Counter consult; the threshold lives here, not in the counter.
    let window = state.config.otp.request_window_seconds;
    let count = state
        .credentials
        .increment_rate_limit(&format!("otp-request:{}", req.email), window)
        .await?;

    if count > state.config.otp.request_attempts {
        tracing::warn!(email = %req.email, count, "OTP request rate limit exceeded");
        return Err(AppError::TooManyRequests(
            "Too many code requests. Please try again later.".to_string(),
            Some(window as u64),
        ));
    }

    state
        .directory
        .find_by_email(&req.email)
        .await
        .map_err(AppError::InternalError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No account for this email")))?;

    let code = generate_code(state.config.otp.code_length);
    let ttl = state.config.otp.ttl_seconds;

    state.credentials.issue_otp(&req.email, &code, ttl).await?;
    state.mailer.send_otp(&req.email, &code, ttl / 60).await?;

    tracing::info!(email = %req.email, "Sign-in code issued");

    Ok(Json(RequestOtpResponse { expires_in: ttl }))
}

/// Verify a one-time code and sign in
///
/// Consumes the code (single use) and returns an access token; a
/// server-side session is created under the token's jti.
#[utoipa::path(
    post,
    path = "/auth/otp/verify",
    request_body = VerifyOtp,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 401, description = "Code missing, expired, used, or wrong", body = ErrorResponse),
    ),
    tag = "Authentication"
)]
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtp>,
) -> Result<Json<TokenResponse>, AppError> {
    req.validate()?;

    state.credentials.verify_otp(&req.email, &req.code).await?;

    let record = state
        .directory
        .find_by_email(&req.email)
        .await
        .map_err(AppError::InternalError)?
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("account not found")))?;

    // Reject accounts the pipeline would refuse to build an actor for
    let actor = AuthenticatedActor::from_record(record)
        .map_err(|e| AppError::AuthError(anyhow::anyhow!("account record invalid: {}", e)))?;

    let (access_token, claims) = state
        .jwt
        .generate_access_token(actor.user_id, &actor.email)?;

    state
        .credentials
        .create_session(&claims.jti, actor.user_id, state.jwt.access_token_expiry_seconds())
        .await?;

    tracing::info!(user_id = %actor.user_id, "User signed in via OTP");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry_seconds(),
    }))
}

/// Sign out, revoking the presented token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Token revoked", body = LogoutResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("missing bearer token")))?;

    // Blacklist for the token's remaining validity, falling back to the
    // configured default when that window is unknown or already past.
    let remaining = claims.exp - Utc::now().timestamp();
    let ttl = if remaining > 0 {
        remaining
    } else {
        state.config.security.blacklist_ttl_seconds
    };

    state.credentials.blacklist_token(token, ttl).await?;
    state.credentials.delete_session(&claims.jti).await?;

    tracing::info!(user_id = %claims.sub, "User signed out");

    Ok(Json(LogoutResponse {
        message: "Signed out".to_string(),
    }))
}

/// Report the status of a token
#[utoipa::path(
    post,
    path = "/auth/introspect",
    request_body = IntrospectRequest,
    responses(
        (status = 200, description = "Token status", body = IntrospectResponse),
    ),
    tag = "Authentication"
)]
pub async fn introspect(
    State(state): State<AppState>,
    Json(req): Json<IntrospectRequest>,
) -> Result<Json<IntrospectResponse>, AppError> {
    if state.credentials.is_token_blacklisted(&req.token).await? {
        return Ok(Json(inactive("revoked")));
    }

    let claims = match state.jwt.verify_access_token(&req.token) {
        Ok(claims) => claims,
        Err(_) => return Ok(Json(inactive("invalid or expired"))),
    };

    let session = state.credentials.get_session(&claims.jti).await?;

    Ok(Json(IntrospectResponse {
        active: true,
        reason: None,
        user_id: Some(claims.sub),
        email: Some(claims.email),
        expires_at: Some(claims.exp),
        session_active: Some(session.is_some()),
    }))
}

fn inactive(reason: &str) -> IntrospectResponse {
    IntrospectResponse {
        active: false,
        reason: Some(reason.to_string()),
        user_id: None,
        email: None,
        expires_at: None,
        session_active: None,
    }
}

fn generate_code(length: u32) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_numeric_and_sized() {
        for length in [4, 6, 9] {
            let code = generate_code(length);
            assert_eq!(code.len(), length as usize);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
