use crate::error::ApiError;
use axum::{extract::Request, middleware::Next, response::Response};

#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
}

/// Session middleware - extracts the user from session layer headers
///
/// The session layer in front of the service sets `x-session-user` after
/// verifying the session cookie or token. `x-forwarded-user` is accepted for
/// oauth2-proxy style deployments, and `x-user` as a local development
/// fallback.
pub async fn auth_middleware(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let id = req
        .headers()
        .get("x-session-user")
        .or_else(|| req.headers().get("x-forwarded-user"))
        .or_else(|| req.headers().get("x-user"))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let email = req
        .headers()
        .get("x-session-email")
        .or_else(|| req.headers().get("x-forwarded-email"))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let id = id.ok_or_else(|| ApiError::Unauthorized("Unauthorized: Login required.".to_string()))?;

    req.extensions_mut().insert(AuthenticatedUser { id, email });

    Ok(next.run(req).await)
}
