//! Request body validation for workspace creation.

use crate::error::ApiError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use workspaces_orchestrator::CreateWorkspaceRequest;

const NAME_MAX_LEN: usize = 32;
const SLUG_MIN_LEN: usize = 3;
const SLUG_MAX_LEN: usize = 48;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9\-]+$").expect("valid regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9]([a-z0-9\-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$").expect("valid regex")
});

/// Slugs that collide with application routes.
const RESERVED_SLUGS: &[&str] = &[
    "admin",
    "api",
    "app",
    "dashboard",
    "help",
    "links",
    "login",
    "logout",
    "register",
    "settings",
    "signup",
    "static",
    "stats",
    "welcome",
    "workspaces",
    "www",
];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWorkspaceBody {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub domain: Option<String>,
}

pub fn validate_create_workspace(body: CreateWorkspaceBody) -> Result<CreateWorkspaceRequest, ApiError> {
    let name = body.name.trim().to_string();
    let name_len = name.chars().count();
    if name_len == 0 || name_len > NAME_MAX_LEN {
        return Err(ApiError::UnprocessableEntity(format!(
            "name: Name must be between 1 and {} characters",
            NAME_MAX_LEN
        )));
    }

    let slug = slugify(&body.slug);
    // Past this check the slug is ASCII, so byte length is character count
    if !slug.is_empty() && !SLUG_RE.is_match(&slug) {
        return Err(ApiError::UnprocessableEntity(
            "slug: Invalid slug format".to_string(),
        ));
    }
    if slug.len() < SLUG_MIN_LEN {
        return Err(ApiError::UnprocessableEntity(format!(
            "slug: Slug must be at least {} characters",
            SLUG_MIN_LEN
        )));
    }
    if slug.len() > SLUG_MAX_LEN {
        return Err(ApiError::UnprocessableEntity(format!(
            "slug: Slug must be less than {} characters",
            SLUG_MAX_LEN
        )));
    }
    if RESERVED_SLUGS.contains(&slug.as_str()) {
        return Err(ApiError::UnprocessableEntity(
            "slug: Cannot use reserved slugs".to_string(),
        ));
    }

    let domain = match body.domain.map(|d| d.trim().to_lowercase()) {
        Some(d) if d.is_empty() => None,
        Some(d) if d.len() > 253 || !DOMAIN_RE.is_match(&d) => {
            return Err(ApiError::UnprocessableEntity(
                "domain: Invalid domain format".to_string(),
            ));
        }
        other => other,
    };

    Ok(CreateWorkspaceRequest { name, slug, domain })
}

/// Lowercase and collapse whitespace runs into single dashes
fn slugify(raw: &str) -> String {
    WHITESPACE_RE
        .replace_all(raw.trim(), "-")
        .to_lowercase()
}
