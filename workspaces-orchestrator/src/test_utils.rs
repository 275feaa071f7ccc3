use crate::cache::MemoryDomainCache;
use crate::domain::{DomainRegistration, DomainService, HostingProvider};
use crate::error::OrchestratorError;
use crate::workspace::WorkspaceOrchestrator;
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Helper to create an in-memory test database with migrations applied
pub async fn create_test_db() -> SqlitePool {
    // Every connection to `sqlite::memory:` opens its own database, so the
    // pool is pinned to one connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Insert a user into the identity table
pub async fn seed_user(pool: &SqlitePool, user_id: &str) {
    sqlx::query("INSERT INTO users (id, email, created_at) VALUES (?, ?, 0)")
        .bind(user_id)
        .bind(format!("{}@example.com", user_id))
        .execute(pool)
        .await
        .expect("Failed to seed user");
}

#[derive(Default, Clone, Copy)]
enum StubOutcome {
    #[default]
    Accept,
    Reject,
    Fail,
}

/// Hosting provider double that records calls and answers with a fixed outcome
#[derive(Default)]
pub struct StubProvider {
    outcome: StubOutcome,
    calls: AtomicUsize,
}

impl StubProvider {
    fn with_outcome(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn accepting() -> Self {
        Self::with_outcome(StubOutcome::Accept)
    }

    /// Answers with an error object in the body
    pub fn rejecting() -> Self {
        Self::with_outcome(StubOutcome::Reject)
    }

    /// The call itself fails, like a dropped connection
    pub fn failing() -> Self {
        Self::with_outcome(StubOutcome::Fail)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostingProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn add_domain(&self, domain: &str) -> crate::Result<DomainRegistration> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            StubOutcome::Accept => Ok(DomainRegistration::registered(domain)),
            StubOutcome::Reject => Ok(DomainRegistration::rejected(
                "forbidden",
                "Not authorized to use this domain",
            )),
            StubOutcome::Fail => Err(OrchestratorError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "hosting provider connection reset",
            ))),
        }
    }
}

/// Orchestrator wired to the given provider and an in-memory cache
pub fn test_orchestrator(
    pool: SqlitePool,
    provider: Arc<StubProvider>,
    cache: MemoryDomainCache,
) -> WorkspaceOrchestrator {
    let domains = DomainService::new(pool.clone(), provider);
    WorkspaceOrchestrator::new(pool, domains, Arc::new(cache))
}
