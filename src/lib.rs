//! Back-office engine for multi-day circuit trips.
//!
//! Quotation of trips for a travelling group, drag-and-drop itinerary
//! planning, variant groups, cotations and invoice status.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod planner;
pub mod quotation;
pub mod routes;

use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::AppCache;
use crate::config::Config;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: AppCache,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            cache: AppCache::new(config.trip_cache_ttl),
            config: Arc::new(config),
        }
    }
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(quotation::router())
        .merge(planner::router())
        .merge(routes::invoices::router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
