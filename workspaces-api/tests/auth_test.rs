//! Integration tests for the session middleware
//!
//! Tests that the middleware extracts the user from session headers in the
//! expected precedence order and rejects requests without one.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Router,
};
use tower::ServiceExt; // for `oneshot`
use workspaces_api::auth::{auth_middleware, AuthenticatedUser};

// Simple handler that returns the authenticated user info
async fn test_handler(
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "id": user.id,
        "email": user.email,
    }))
}

// Create a test app with auth middleware
fn create_test_app() -> Router {
    Router::new()
        .route("/protected", get(test_handler))
        .layer(middleware::from_fn(auth_middleware))
}

async fn call(headers: &[(&str, &str)]) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().uri("/protected");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();

    let response = create_test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    (status, json)
}

#[tokio::test]
async fn test_x_user_header_passes() {
    let (status, json) = call(&[("x-user", "user_dev")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "user_dev");
    assert!(json["email"].is_null());
}

#[tokio::test]
async fn test_session_headers_pass_with_email() {
    let (status, json) = call(&[
        ("x-session-user", "user_123"),
        ("x-session-email", "alice@example.com"),
    ])
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "user_123");
    assert_eq!(json["email"], "alice@example.com");
}

#[tokio::test]
async fn test_x_forwarded_user_header_works() {
    let (status, json) = call(&[
        ("x-forwarded-user", "proxied"),
        ("x-forwarded-email", "proxied@example.com"),
    ])
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "proxied");
    assert_eq!(json["email"], "proxied@example.com");
}

#[tokio::test]
async fn test_session_header_takes_precedence() {
    let (status, json) = call(&[
        ("x-user", "dev"),
        ("x-forwarded-user", "proxied"),
        ("x-session-user", "session"),
    ])
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "session");
}

#[tokio::test]
async fn test_missing_user_header_returns_401() {
    let (status, json) = call(&[]).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_blank_user_header_returns_401() {
    let (status, _) = call(&[("x-user", "   ")]).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
