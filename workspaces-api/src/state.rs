use crate::config::Config;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};
use workspaces_orchestrator::{
    DisabledProvider, DomainCache, DomainService, HostingProvider, MemoryDomainCache,
    RedisDomainCache, VercelProvider, WorkspaceOrchestrator,
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: WorkspaceOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: WorkspaceOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Wire the orchestrator to the collaborators selected by `config`
    pub async fn from_config(pool: SqlitePool, config: &Config) -> anyhow::Result<Self> {
        let provider: Arc<dyn HostingProvider> = match config.vercel_settings() {
            Some(settings) => {
                info!("Custom domains are registered with Vercel");
                Arc::new(VercelProvider::new(settings))
            }
            None => {
                warn!("VERCEL_API_TOKEN/VERCEL_PROJECT_ID not set, custom domain registration disabled");
                Arc::new(DisabledProvider)
            }
        };

        let cache: Arc<dyn DomainCache> = match &config.redis_url {
            Some(url) => {
                info!("Connecting to Redis domain cache");
                Arc::new(RedisDomainCache::connect(url).await?)
            }
            None => {
                warn!("WORKSPACES_REDIS_URL not set, using in-process domain cache");
                Arc::new(MemoryDomainCache::new())
            }
        };

        let domains = DomainService::new(pool.clone(), provider);
        let orchestrator = WorkspaceOrchestrator::new(pool, domains, cache)
            .with_settings(config.workspace_settings());

        Ok(Self::new(orchestrator))
    }
}
