//! Pipeline tests: bearer extraction, revocation, verification, actor load.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use campus_auth::models::{ActorRecord, Role};
use common::TestApp;

fn check_request(token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/authz/check")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn role_check() -> Value {
    json!({"check": "role", "allowed": ["staff", "hod"]})
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(check_request(None, role_check()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "missing bearer token");
}

#[tokio::test]
async fn malformed_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(check_request(Some("not-a-jwt"), role_check()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid or expired token");
}

#[tokio::test]
async fn valid_token_reaches_the_handler() {
    let app = TestApp::new();
    let record = app.seed_actor("staff@college.edu", Role::Staff, None);
    let token = app.token_for(&record);

    let response = app
        .router()
        .oneshot(check_request(Some(&token), role_check()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn revoked_token_is_rejected_before_verification() {
    let app = TestApp::new();
    let record = app.seed_actor("staff@college.edu", Role::Staff, None);
    let token = app.token_for(&record);

    app.state
        .credentials
        .blacklist_token(&token, 3600)
        .await
        .unwrap();

    let response = app
        .router()
        .oneshot(check_request(Some(&token), role_check()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "token has been revoked");
}

#[tokio::test]
async fn revocation_is_consulted_before_signature_verification() {
    let app = TestApp::new();

    // Not even a well-formed token, but blacklisted: reported as revoked,
    // not as invalid.
    app.state
        .credentials
        .blacklist_token("not-a-jwt", 3600)
        .await
        .unwrap();

    let response = app
        .router()
        .oneshot(check_request(Some("not-a-jwt"), role_check()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "token has been revoked");
}

#[tokio::test]
async fn token_for_unknown_account_is_rejected() {
    let app = TestApp::new();

    // A well-signed token whose subject is not in the directory.
    let ghost = ActorRecord {
        user_id: Uuid::new_v4(),
        email: "ghost@college.edu".to_string(),
        role: Role::Staff,
        department_id: None,
        college_id: Uuid::new_v4(),
        module_permissions: Vec::new(),
    };
    let token = app.token_for(&ghost);

    let response = app
        .router()
        .oneshot(check_request(Some(&token), role_check()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "account not found");
}

#[tokio::test]
async fn invalid_account_record_is_rejected() {
    let app = TestApp::new();
    // A HOD record without a department fails actor validation.
    let record = app.seed_actor("hod@college.edu", Role::Hod, None);
    let token = app.token_for(&record);

    let response = app
        .router()
        .oneshot(check_request(Some(&token), role_check()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "account record invalid");
}
