use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circuit_desk::{app, cache, config::Config, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circuit_desk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST")?,
        config.port,
    );

    let state = AppState::new(pool.clone(), config);
    tokio::spawn(cache::start_cache_warmer(state.cache.clone(), pool));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Starting server on {addr}");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
