//! Routing-time lookup from a custom domain to its workspace.

use crate::error::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

/// Hash field holding the entry for the bare domain.
const ROOT_FIELD: &str = "_root";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootDomainEntry {
    /// Domain row id
    pub id: i64,
    #[serde(skip)]
    pub domain: String,
    pub project_id: i64,
}

#[async_trait]
pub trait DomainCache: Send + Sync {
    async fn set_root_domain(&self, entry: &RootDomainEntry) -> Result<()>;

    async fn get_root_domain(&self, domain: &str) -> Result<Option<RootDomainEntry>>;
}

fn cache_key(domain: &str) -> String {
    domain.to_lowercase()
}

#[derive(Clone)]
pub struct RedisDomainCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisDomainCache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl DomainCache for RedisDomainCache {
    #[instrument(skip(self, entry), fields(domain = %entry.domain))]
    async fn set_root_domain(&self, entry: &RootDomainEntry) -> Result<()> {
        let value = serde_json::to_string(entry)?;
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(cache_key(&entry.domain), ROOT_FIELD, value)
            .await?;
        Ok(())
    }

    async fn get_root_domain(&self, domain: &str) -> Result<Option<RootDomainEntry>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(cache_key(domain), ROOT_FIELD).await?;

        match raw {
            Some(raw) => {
                let mut entry: RootDomainEntry = serde_json::from_str(&raw)?;
                entry.domain = cache_key(domain);
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }
}

/// In-process cache for development and tests.
#[derive(Clone, Default)]
pub struct MemoryDomainCache {
    entries: Arc<RwLock<HashMap<String, RootDomainEntry>>>,
}

impl MemoryDomainCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DomainCache for MemoryDomainCache {
    async fn set_root_domain(&self, entry: &RootDomainEntry) -> Result<()> {
        let key = cache_key(&entry.domain);
        let mut stored = entry.clone();
        stored.domain = key.clone();
        self.entries.write().await.insert(key, stored);
        Ok(())
    }

    async fn get_root_domain(&self, domain: &str) -> Result<Option<RootDomainEntry>> {
        Ok(self.entries.read().await.get(&cache_key(domain)).cloned())
    }
}
