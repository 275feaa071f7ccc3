//! Common test utilities and helpers for workspaces-api tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;
use workspaces_api::{create_app, AppState};
use workspaces_orchestrator::test_utils::{test_orchestrator, StubProvider};
use workspaces_orchestrator::MemoryDomainCache;

pub use workspaces_orchestrator::test_utils::{create_test_db, seed_user};

/// Helper to extract JSON body from axum response
pub async fn extract_json_body<T>(response: axum::response::Response) -> T
where
    T: serde::de::DeserializeOwned,
{
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    serde_json::from_slice(&body).expect("Failed to deserialize JSON")
}

/// TestClient to encapsulate API interaction logic
pub struct TestClient {
    pub app: Router,
    pub pool: SqlitePool,
    pub provider: Arc<StubProvider>,
    pub cache: MemoryDomainCache,
}

impl TestClient {
    /// New client on a fresh in-memory DB with an accepting hosting provider
    pub async fn new() -> Self {
        Self::with_provider(StubProvider::accepting()).await
    }

    pub async fn with_provider(provider: StubProvider) -> Self {
        let pool = create_test_db().await;
        let provider = Arc::new(provider);
        let cache = MemoryDomainCache::new();
        let orchestrator = test_orchestrator(pool.clone(), provider.clone(), cache.clone());
        let app = create_app(AppState::new(orchestrator));

        Self {
            app,
            pool,
            provider,
            cache,
        }
    }

    pub async fn seed_user(&self, user_id: &str) {
        seed_user(&self.pool, user_id).await;
    }

    pub async fn count(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count rows");
        count
    }

    /// Send a request to the API
    pub async fn send_request(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Post JSON to an endpoint
    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
        user: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");

        if let Some(user) = user {
            builder = builder.header("x-user", user);
        }

        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.send_request(request).await
    }

    /// Get request to an endpoint
    pub async fn get(&self, uri: &str, user: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);

        if let Some(user) = user {
            builder = builder.header("x-user", user);
        }

        let request = builder.body(Body::empty()).unwrap();
        self.send_request(request).await
    }
}
