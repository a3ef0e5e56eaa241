use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

use giveflow_backend::{api, cache, config::Config, database};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting Giveflow Backend");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Gateway base URL: {}", config.gateway.base_url);

    // Connect to Postgres; the service cannot run without its store.
    let db_pool = database::init_pool(
        &config.database.url,
        Some(database::PoolConfig {
            max_connections: config.database.max_connections,
            ..Default::default()
        }),
    )
    .await?;

    // Redis only backs the rate limiter, which fails open, so a degraded
    // cache is logged at startup but does not abort.
    let cache_pool = cache::init_cache_pool(cache::CacheConfig {
        redis_url: config.redis.url.clone(),
        ..Default::default()
    })
    .await?;

    if let Err(e) = cache::health_check(&cache_pool).await {
        tracing::warn!("Redis unavailable at startup: {}", e);
    }
    database::health_check(&db_pool).await?;

    // Build router
    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(config.clone());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
