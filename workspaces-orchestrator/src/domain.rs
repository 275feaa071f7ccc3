//! Custom domain lookups and registration with the hosting platform.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, instrument};

const VERCEL_API_BASE: &str = "https://api.vercel.com";

/// Response of a domain registration call.
///
/// Providers report rejections (domain owned elsewhere, invalid name, quota)
/// in the body rather than through the transport, so a registration is only
/// considered live when `error` is absent. The error is kept as raw JSON:
/// any shape, with or without a `code`, counts as a rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainRegistration {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl DomainRegistration {
    pub fn registered(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            verified: None,
            error: None,
        }
    }

    pub fn rejected(code: &str, message: &str) -> Self {
        Self {
            name: None,
            verified: None,
            error: Some(serde_json::json!({ "code": code, "message": message })),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Provider error code, when the rejection carries one
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref()?.get("code")?.as_str()
    }
}

/// Registers custom domains with the platform that serves traffic for them.
#[async_trait]
pub trait HostingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn add_domain(&self, domain: &str) -> Result<DomainRegistration>;
}

#[derive(Debug, Clone)]
pub struct VercelSettings {
    pub api_token: String,
    pub project_id: String,
    pub team_id: Option<String>,
    pub api_base: String,
}

impl VercelSettings {
    pub fn new(api_token: String, project_id: String, team_id: Option<String>) -> Self {
        Self {
            api_token,
            project_id,
            team_id,
            api_base: VERCEL_API_BASE.to_string(),
        }
    }
}

pub struct VercelProvider {
    client: reqwest::Client,
    settings: VercelSettings,
}

impl VercelProvider {
    pub fn new(settings: VercelSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    fn domains_url(&self) -> String {
        let mut url = format!(
            "{}/v10/projects/{}/domains",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.project_id
        );
        if let Some(team_id) = &self.settings.team_id {
            url.push_str("?teamId=");
            url.push_str(team_id);
        }
        url
    }
}

#[async_trait]
impl HostingProvider for VercelProvider {
    fn name(&self) -> &'static str {
        "vercel"
    }

    #[instrument(skip(self))]
    async fn add_domain(&self, domain: &str) -> Result<DomainRegistration> {
        let response = self
            .client
            .post(self.domains_url())
            .bearer_auth(&self.settings.api_token)
            .json(&serde_json::json!({ "name": domain }))
            .send()
            .await?;

        let status = response.status();
        // Error responses still carry a JSON body with an `error` object
        let registration: DomainRegistration = response.json().await?;
        debug!(%status, success = registration.is_success(), "Vercel domain registration answered");

        Ok(registration)
    }
}

/// Used when no hosting provider is configured: every registration is
/// reported as rejected so no routing entry is ever published.
pub struct DisabledProvider;

#[async_trait]
impl HostingProvider for DisabledProvider {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn add_domain(&self, _domain: &str) -> Result<DomainRegistration> {
        Ok(DomainRegistration::rejected(
            "provider_not_configured",
            "No hosting provider is configured for custom domains",
        ))
    }
}

#[derive(Clone)]
pub struct DomainService {
    pool: SqlitePool,
    provider: Arc<dyn HostingProvider>,
}

impl DomainService {
    pub fn new(pool: SqlitePool, provider: Arc<dyn HostingProvider>) -> Self {
        Self { pool, provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Whether any workspace already holds this domain.
    #[instrument(skip(self))]
    pub async fn domain_exists(&self, domain: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM domains WHERE slug = ?")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    pub async fn add_domain(&self, domain: &str) -> Result<DomainRegistration> {
        self.provider.add_domain(domain).await
    }
}
