//! Health check route

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: bool,
    cache: CacheStats,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    if !database {
        tracing::warn!("Health check could not reach the database");
    }

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        cache: state.cache.stats(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
