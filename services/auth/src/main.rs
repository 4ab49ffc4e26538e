use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use auth::{
    AppState, database,
    jwt::{JwtConfig, JwtService},
    notifications::NotifierConfig,
    repositories::PgAccountStore,
    routes,
    storage::StorageConfig,
};
use common::database::{DatabaseConfig, health_check, init_pool};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting account service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    // Initialize JWT service
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(jwt_config)?;

    let storage_config = StorageConfig::from_env();
    tokio::fs::create_dir_all(&storage_config.media_root).await?;

    let notifier_config = NotifierConfig::from_env();
    if notifier_config.webhook_url.is_none() {
        info!("NOTIFIER_WEBHOOK_URL not set; status notifications will only be logged");
    }

    let admin_token = std::env::var("ADMIN_API_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty());
    if admin_token.is_none() {
        warn!("ADMIN_API_TOKEN not set; admin routes are disabled");
    }

    let app_state = AppState {
        db_pool: Some(pool.clone()),
        store: Arc::new(PgAccountStore::new(pool)),
        jwt_service,
        content_store: storage_config.build(),
        media_root: storage_config.media_root.clone(),
        notifier: notifier_config.build()?,
        notification_sender: notifier_config.from_address.clone(),
        admin_token,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Account service listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
