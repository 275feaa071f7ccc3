use crate::cache::{DomainCache, RootDomainEntry};
use crate::domain::DomainService;
use crate::error::{OrchestratorError, Result};
use crate::plan::{Plan, Role, FREE_WORKSPACES_LIMIT};
use chrono::{DateTime, Datelike, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

const WORKSPACE_ID_PREFIX: &str = "ws_";
const INVITE_CODE_LENGTH: usize = 24;

/// Platform short domains every new workspace gets access to.
pub const DEFAULT_DOMAINS: &[&str] = &["dub.sh", "chatg.pt", "spti.fi", "git.new", "amzn.id"];

/// Internal numeric workspace id. Rendered externally as `ws_<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkspaceId(pub i64);

impl WorkspaceId {
    pub fn internal(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", WORKSPACE_ID_PREFIX, self.0)
    }
}

impl FromStr for WorkspaceId {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix(WORKSPACE_ID_PREFIX)
            .and_then(|n| n.parse().ok())
            .map(WorkspaceId)
            .ok_or_else(|| OrchestratorError::InvalidInput(format!("Invalid workspace id: {}", s)))
    }
}

impl Serialize for WorkspaceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WorkspaceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[schema(value_type = String, example = "ws_1")]
    pub id: WorkspaceId,
    pub name: String,
    pub slug: String,
    pub plan: Plan,
    pub billing_cycle_start: u32,
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
    pub domains: Vec<DomainSummary>,
    /// The requesting user's membership only.
    pub users: Vec<MembershipRole>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DomainSummary {
    pub slug: String,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MembershipRole {
    pub role: Role,
}

/// Already-validated input for [`WorkspaceOrchestrator::create_workspace`].
#[derive(Debug, Clone)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    pub free_workspaces_limit: i64,
    pub default_domains: Vec<String>,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            free_workspaces_limit: FREE_WORKSPACES_LIMIT,
            default_domains: DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[derive(Clone)]
pub struct WorkspaceOrchestrator {
    pool: SqlitePool,
    domains: DomainService,
    cache: Arc<dyn DomainCache>,
    settings: WorkspaceSettings,
}

impl WorkspaceOrchestrator {
    pub fn new(pool: SqlitePool, domains: DomainService, cache: Arc<dyn DomainCache>) -> Self {
        Self {
            pool,
            domains,
            cache,
            settings: WorkspaceSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: WorkspaceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    /// List every workspace the user is a member of
    #[instrument(skip(self))]
    pub async fn list_workspaces(&self, user_id: &str) -> Result<Vec<Workspace>> {
        let (rows, domain_rows) = tokio::try_join!(
            sqlx::query_as::<_, MemberWorkspaceRow>(
                "SELECT w.id, w.name, w.slug, w.plan, w.billing_cycle_start, w.invite_code,
                        w.created_at, m.role
                 FROM workspaces w
                 JOIN memberships m ON m.workspace_id = w.id
                 WHERE m.user_id = ?
                 ORDER BY w.created_at ASC, w.id ASC",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
            sqlx::query_as::<_, DomainRow>(
                "SELECT d.workspace_id, d.slug, d.is_primary
                 FROM domains d
                 JOIN memberships m ON m.workspace_id = d.workspace_id
                 WHERE m.user_id = ?
                 ORDER BY d.id ASC",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )?;

        let mut domains_by_workspace: HashMap<i64, Vec<DomainSummary>> = HashMap::new();
        for row in domain_rows {
            domains_by_workspace
                .entry(row.workspace_id)
                .or_default()
                .push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let domains = domains_by_workspace.remove(&row.id).unwrap_or_default();
                row.into_workspace(domains)
            })
            .collect()
    }

    /// Create a workspace owned by `user_id`, optionally with a custom domain.
    ///
    /// All preconditions are checked before anything is written. The workspace
    /// insert and the provider registration then run side by side; a rejected
    /// registration leaves the workspace in place without a routing entry.
    #[instrument(skip(self, req), fields(slug = %req.slug, domain = ?req.domain))]
    pub async fn create_workspace(
        &self,
        user_id: &str,
        req: CreateWorkspaceRequest,
    ) -> Result<Workspace> {
        if !self.user_exists(user_id).await? {
            return Err(OrchestratorError::NotFound(
                "Session expired. Please log in again.".to_string(),
            ));
        }

        let limit = self.settings.free_workspaces_limit;
        if self.count_owned_free_workspaces(user_id).await? >= limit {
            return Err(OrchestratorError::ExceededLimit(format!(
                "You can only create up to {} free workspaces. Additional workspaces require a paid plan.",
                limit
            )));
        }

        let domain = req.domain.as_deref();
        let (slug_taken, domain_taken) = tokio::try_join!(self.slug_exists(&req.slug), async {
            match domain {
                Some(domain) => self.domains.domain_exists(domain).await,
                None => Ok(false),
            }
        })?;

        if slug_taken {
            return Err(OrchestratorError::slug_conflict());
        }
        if domain_taken {
            return Err(OrchestratorError::domain_conflict());
        }

        let (created, registration) = tokio::join!(self.insert_workspace(user_id, &req), async {
            match domain {
                Some(domain) => self.domains.add_domain(domain).await.map(Some),
                None => Ok(None),
            }
        });
        let (workspace, primary_domain_id) = created?;
        let registration = registration?;

        if let (Some(domain), Some(domain_id), Some(registration)) =
            (domain, primary_domain_id, registration)
        {
            if registration.is_success() {
                self.cache
                    .set_root_domain(&RootDomainEntry {
                        id: domain_id,
                        domain: domain.to_string(),
                        project_id: workspace.id.internal(),
                    })
                    .await?;
            } else {
                warn!(
                    provider = self.domains.provider_name(),
                    error = ?registration.error,
                    "Domain registration rejected; workspace created without routing entry"
                );
            }
        }

        info!(workspace_id = %workspace.id, "Workspace created");

        Ok(workspace)
    }

    /// Whether the session's user is still present in the identity store
    pub async fn user_exists(&self, user_id: &str) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Count free-plan workspaces where the user holds the owner role
    pub async fn count_owned_free_workspaces(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM workspaces w
             JOIN memberships m ON m.workspace_id = w.id
             WHERE w.plan = ? AND m.user_id = ? AND m.role = ?",
        )
        .bind(Plan::Free)
        .bind(user_id)
        .bind(Role::Owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar("SELECT slug FROM workspaces WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Insert the workspace with its owner membership, optional primary
    /// domain and default-domain rows in one transaction. Returns the
    /// workspace and the id of the primary domain row, if any.
    async fn insert_workspace(
        &self,
        user_id: &str,
        req: &CreateWorkspaceRequest,
    ) -> Result<(Workspace, Option<i64>)> {
        let now = Utc::now();
        let billing_cycle_start = now.day();
        let invite_code = generate_invite_code();

        let mut tx = self.pool.begin().await?;

        let workspace_id = sqlx::query(
            "INSERT INTO workspaces (name, slug, plan, billing_cycle_start, invite_code, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&req.name)
        .bind(&req.slug)
        .bind(Plan::Free)
        .bind(billing_cycle_start)
        .bind(&invite_code)
        .bind(now.timestamp())
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO memberships (user_id, workspace_id, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(workspace_id)
        .bind(Role::Owner)
        .bind(now.timestamp())
        .execute(&mut *tx)
        .await?;

        let mut domains = Vec::new();
        let mut primary_domain_id = None;
        if let Some(domain) = &req.domain {
            let domain_id = sqlx::query(
                "INSERT INTO domains (slug, workspace_id, is_primary, created_at) VALUES (?, ?, 1, ?)",
            )
            .bind(domain)
            .bind(workspace_id)
            .bind(now.timestamp())
            .execute(&mut *tx)
            .await
            .map_err(map_unique_violation)?
            .last_insert_rowid();

            primary_domain_id = Some(domain_id);
            domains.push(DomainSummary {
                slug: domain.clone(),
                primary: true,
            });
        }

        // Settings may list a domain twice; the (workspace, domain) key keeps one row
        for default_domain in &self.settings.default_domains {
            sqlx::query("INSERT OR IGNORE INTO default_domains (workspace_id, domain) VALUES (?, ?)")
                .bind(workspace_id)
                .bind(default_domain)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let workspace = Workspace {
            id: WorkspaceId(workspace_id),
            name: req.name.clone(),
            slug: req.slug.clone(),
            plan: Plan::Free,
            billing_cycle_start,
            invite_code,
            // Stored with second precision
            created_at: DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now),
            domains,
            users: vec![MembershipRole { role: Role::Owner }],
        };

        Ok((workspace, primary_domain_id))
    }

    /// Default domains enabled for a workspace
    pub async fn default_domains(&self, workspace_id: WorkspaceId) -> Result<Vec<String>> {
        let domains: Vec<String> = sqlx::query_scalar(
            "SELECT domain FROM default_domains WHERE workspace_id = ? AND enabled = 1 ORDER BY domain",
        )
        .bind(workspace_id.internal())
        .fetch_all(&self.pool)
        .await?;

        Ok(domains)
    }
}

fn generate_invite_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Two concurrent creates can both pass the existence checks; the store's
/// unique constraints decide the loser.
fn map_unique_violation(err: sqlx::Error) -> OrchestratorError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if db_err.message().contains("workspaces.slug") {
                return OrchestratorError::slug_conflict();
            }
            if db_err.message().contains("domains.slug") {
                return OrchestratorError::domain_conflict();
            }
        }
    }
    OrchestratorError::Database(err)
}

// Internal row types for sqlx
#[derive(sqlx::FromRow)]
struct MemberWorkspaceRow {
    id: i64,
    name: String,
    slug: String,
    plan: Plan,
    billing_cycle_start: i64,
    invite_code: String,
    created_at: i64,
    role: Role,
}

#[derive(sqlx::FromRow)]
struct DomainRow {
    workspace_id: i64,
    slug: String,
    is_primary: bool,
}

impl MemberWorkspaceRow {
    fn into_workspace(self, domains: Vec<DomainSummary>) -> Result<Workspace> {
        let billing_cycle_start = u32::try_from(self.billing_cycle_start)
            .ok()
            .filter(|day| (1..=31).contains(day))
            .ok_or_else(|| {
                OrchestratorError::CorruptRecord(format!(
                    "workspace {} has billing cycle start {}",
                    self.id, self.billing_cycle_start
                ))
            })?;
        let created_at = DateTime::from_timestamp(self.created_at, 0).ok_or_else(|| {
            OrchestratorError::CorruptRecord(format!(
                "workspace {} has creation time {}",
                self.id, self.created_at
            ))
        })?;

        Ok(Workspace {
            id: WorkspaceId(self.id),
            name: self.name,
            slug: self.slug,
            plan: self.plan,
            billing_cycle_start,
            invite_code: self.invite_code,
            created_at,
            domains,
            users: vec![MembershipRole { role: self.role }],
        })
    }
}

impl From<DomainRow> for DomainSummary {
    fn from(row: DomainRow) -> Self {
        Self {
            slug: row.slug,
            primary: row.is_primary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_id_renders_with_prefix() {
        assert_eq!(WorkspaceId(42).to_string(), "ws_42");
        assert_eq!(
            serde_json::to_value(WorkspaceId(7)).unwrap(),
            serde_json::json!("ws_7")
        );
    }

    #[test]
    fn test_workspace_id_parse_rejects_unprefixed() {
        assert_eq!("ws_12".parse::<WorkspaceId>().unwrap(), WorkspaceId(12));
        assert!("12".parse::<WorkspaceId>().is_err());
        assert!("ws_abc".parse::<WorkspaceId>().is_err());
    }

    #[test]
    fn test_invite_code_is_24_alphanumeric_chars() {
        let code = generate_invite_code();

        assert_eq!(code.len(), INVITE_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(code, generate_invite_code());
    }

    use crate::cache::MemoryDomainCache;
    use crate::test_utils::{create_test_db, seed_user, test_orchestrator, StubProvider};

    async fn seed_workspace(pool: &SqlitePool, slug: &str, domain: Option<&str>) -> i64 {
        let id = sqlx::query(
            "INSERT INTO workspaces (name, slug, billing_cycle_start, invite_code, created_at)
             VALUES (?, ?, 1, ?, 0)",
        )
        .bind(slug)
        .bind(slug)
        .bind(generate_invite_code())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

        if let Some(domain) = domain {
            sqlx::query("INSERT INTO domains (slug, workspace_id, created_at) VALUES (?, ?, 0)")
                .bind(domain)
                .bind(id)
                .execute(pool)
                .await
                .unwrap();
        }
        id
    }

    async fn workspace_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM workspaces")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn request(slug: &str, domain: Option<&str>) -> CreateWorkspaceRequest {
        CreateWorkspaceRequest {
            name: "Acme".to_string(),
            slug: slug.to_string(),
            domain: domain.map(|d| d.to_string()),
        }
    }

    // A create that lost the race passed the existence checks; the insert
    // itself must still report the conflict.
    #[tokio::test]
    async fn test_insert_racing_on_slug_reports_slug_conflict() {
        let pool = create_test_db().await;
        seed_user(&pool, "user_alice").await;
        let orchestrator = test_orchestrator(
            pool.clone(),
            Arc::new(StubProvider::accepting()),
            MemoryDomainCache::new(),
        );
        seed_workspace(&pool, "acme", None).await;

        let err = orchestrator
            .insert_workspace("user_alice", &request("acme", None))
            .await
            .unwrap_err();

        assert!(
            matches!(err, OrchestratorError::Conflict(ref m) if m == "Slug is already in use."),
            "unexpected error: {err}"
        );
        assert_eq!(workspace_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_insert_racing_on_domain_reports_domain_conflict() {
        let pool = create_test_db().await;
        seed_user(&pool, "user_alice").await;
        let orchestrator = test_orchestrator(
            pool.clone(),
            Arc::new(StubProvider::accepting()),
            MemoryDomainCache::new(),
        );
        seed_workspace(&pool, "other", Some("acme.com")).await;

        let err = orchestrator
            .insert_workspace("user_alice", &request("acme", Some("acme.com")))
            .await
            .unwrap_err();

        assert!(
            matches!(err, OrchestratorError::Conflict(ref m) if m == "Domain is already in use."),
            "unexpected error: {err}"
        );
        // The workspace row written earlier in the transaction is rolled back
        assert_eq!(workspace_count(&pool).await, 1);
        let memberships: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memberships")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(memberships, 0);
    }

    #[tokio::test]
    async fn test_list_rejects_out_of_range_billing_day() {
        let pool = create_test_db().await;
        seed_user(&pool, "user_alice").await;
        let orchestrator = test_orchestrator(
            pool.clone(),
            Arc::new(StubProvider::accepting()),
            MemoryDomainCache::new(),
        );
        let workspace = orchestrator
            .create_workspace("user_alice", request("acme", None))
            .await
            .unwrap();

        sqlx::query("UPDATE workspaces SET billing_cycle_start = -3 WHERE id = ?")
            .bind(workspace.id.internal())
            .execute(&pool)
            .await
            .unwrap();

        let err = orchestrator.list_workspaces("user_alice").await.unwrap_err();

        assert!(
            matches!(err, OrchestratorError::CorruptRecord(ref m) if m.contains("billing cycle start -3")),
            "unexpected error: {err}"
        );
    }
}
