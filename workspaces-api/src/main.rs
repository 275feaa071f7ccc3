use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use workspaces_api::{create_app, AppState, Config};
use workspaces_orchestrator::db::{create_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("workspaces_api=debug,workspaces_orchestrator=debug,tower_http=debug")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting workspaces-api service...");

    // Load configuration
    let config = Config::from_env();
    info!(
        "Configuration loaded: bind_addr={}, db_path={}, free_workspaces_limit={}",
        config.bind_addr,
        config.db_path.display(),
        config.free_workspaces_limit
    );

    // Create pool and run migrations
    let pool = create_pool(&config.db_path).await?;
    info!("Running database migrations...");
    run_migrations(&pool).await?;
    info!("Migrations complete");

    let state = AppState::from_config(pool, &config).await?;
    let app = create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal, stopping workspaces-api gracefully");
        })
        .await?;

    Ok(())
}
