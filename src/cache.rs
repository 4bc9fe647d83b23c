//! In-memory caching using moka
//!
//! Loaded trips are cached for pricing and invalidated whenever the planner
//! or a cotation touches them. Tenant condition options change rarely and
//! are refreshed by a background warmer.

use moka::future::Cache;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::models::{ConditionOption, TripSnapshot};

const CONDITION_OPTIONS_KEY: &str = "condition_options";

/// Application cache holding loaded trips and condition options
#[derive(Clone)]
pub struct AppCache {
    /// Trips with their activated conditions (trip id -> snapshot)
    pub trips: Cache<Uuid, Arc<TripSnapshot>>,
    /// Tenant condition options (singleton)
    pub condition_options: Cache<String, Arc<Vec<ConditionOption>>>,
}

impl AppCache {
    /// Create a new cache instance with the given trip TTL
    pub fn new(trip_ttl: Duration) -> Self {
        Self {
            // Trips: 200 entries, idle trips dropped after 5 min
            trips: Cache::builder()
                .max_capacity(200)
                .time_to_live(trip_ttl)
                .time_to_idle(Duration::from_secs(5 * 60))
                .build(),

            // Condition options: 1 entry, 30 min TTL
            condition_options: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(30 * 60))
                .build(),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            trips_size: self.trips.entry_count(),
            condition_options_cached: self.condition_options.entry_count() > 0,
        }
    }

    /// Drop a trip after it was modified
    pub async fn invalidate_trip(&self, trip_id: Uuid) {
        self.trips.invalidate(&trip_id).await;
        info!("Cache invalidated for trip: {}", trip_id);
    }

    pub async fn condition_options(&self) -> Option<Arc<Vec<ConditionOption>>> {
        self.condition_options.get(CONDITION_OPTIONS_KEY).await
    }

    pub async fn set_condition_options(&self, options: Vec<ConditionOption>) {
        self.condition_options
            .insert(CONDITION_OPTIONS_KEY.to_string(), Arc::new(options))
            .await;
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(5 * 60))
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub trips_size: u64,
    pub condition_options_cached: bool,
}

/// Start background cache warmer
///
/// Warms the condition options on startup and refreshes every 10 minutes.
pub async fn start_cache_warmer(cache: AppCache, db: PgPool) {
    let mut interval = interval(Duration::from_secs(10 * 60));
    loop {
        // First tick completes immediately
        interval.tick().await;
        warm_cache(&cache, &db).await;
    }
}

async fn warm_cache(cache: &AppCache, db: &PgPool) {
    info!("Starting cache warm-up...");

    match queries::get_condition_options(db).await {
        Ok(options) => cache.set_condition_options(options).await,
        Err(e) => warn!("Failed to warm condition options cache: {}", e),
    }

    info!("Cache warm-up complete. Stats: {:?}", cache.stats());
}
