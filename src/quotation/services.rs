//! Quotation service functions with database access.
//!
//! Trips are loaded through the cache; the pricing itself is delegated to the
//! pure functions in [`super::calculators`].

use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::AppCache;
use crate::config::Config;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::condition::{active_formula_ids, variant_group_reports, VariantGroupReport};
use crate::models::{ConditionSelection, Cotation, Item, TripSnapshot};

use super::calculators::{
    calculate_quotation, ExchangeRates, MarginSettings, QuotationError, QuotationResult, Travelers,
};
use super::responses::QuotationResponse;

/// Quotation of a whole trip
#[derive(Debug, Clone)]
pub struct TripQuotation {
    pub active_formula_ids: Vec<Uuid>,
    pub result: QuotationResult,
}

/// Load a trip, from the cache when possible
pub async fn load_trip(
    pool: &PgPool,
    cache: &AppCache,
    config: &Config,
    trip_id: Uuid,
) -> Result<Arc<TripSnapshot>> {
    if let Some(cached) = cache.trips.get(&trip_id).await {
        tracing::debug!("Cache HIT for trip: {}", trip_id);
        return Ok(cached);
    }

    tracing::debug!("Cache MISS for trip: {}", trip_id);
    let snapshot = queries::load_trip(
        pool,
        trip_id,
        &config.default_currency,
        config.default_margin_pct,
    )
    .await?
    .ok_or(AppError::NotFound("Trip"))?;

    let snapshot = Arc::new(snapshot);
    cache.trips.insert(trip_id, snapshot.clone()).await;
    Ok(snapshot)
}

/// Price every active block of a trip with the trip's margin settings.
///
/// Variant groups are resolved first so only the selected option of each
/// activated condition is priced.
pub fn quote_trip(
    snapshot: &TripSnapshot,
    travelers: &Travelers,
    rates: &ExchangeRates,
) -> std::result::Result<TripQuotation, QuotationError> {
    let trip = &snapshot.trip;
    let selection = ConditionSelection::from_trip_conditions(&snapshot.conditions);
    let active = active_formula_ids(trip.formulas(), &selection);

    let items: Vec<&Item> = trip
        .formulas()
        .filter(|f| active.contains(&f.id))
        .flat_map(|f| f.items.iter())
        .collect();

    let settings = MarginSettings::new(trip.margin_pct, trip.margin_type)
        .with_vat(trip.vat_pct)
        .with_commission(trip.commission_pct);

    let result = calculate_quotation(items, travelers, &settings, &trip.currency, rates)?;

    Ok(TripQuotation {
        active_formula_ids: active,
        result,
    })
}

/// Variant-group consistency reports of a trip
pub async fn variant_groups(
    pool: &PgPool,
    cache: &AppCache,
    snapshot: &TripSnapshot,
) -> Result<Vec<VariantGroupReport>> {
    let options = match cache.condition_options().await {
        Some(options) => options,
        None => {
            let options = queries::get_condition_options(pool).await?;
            cache.set_condition_options(options.clone()).await;
            Arc::new(options)
        }
    };

    let formulas: Vec<_> = snapshot.trip.formulas().collect();
    let selection = ConditionSelection::from_trip_conditions(&snapshot.conditions);
    Ok(variant_group_reports(&formulas, &options, &selection))
}

/// Quote a trip and store the result as a cotation
pub async fn save_cotation(
    pool: &PgPool,
    cache: &AppCache,
    config: &Config,
    trip_id: Uuid,
    label: Option<String>,
    travelers: Travelers,
    rates: &ExchangeRates,
) -> Result<Cotation> {
    let snapshot = load_trip(pool, cache, config, trip_id).await?;
    let quotation = quote_trip(&snapshot, &travelers, rates)?;

    let label = label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| format!("{} pax", travelers.pax()));
    let result = serde_json::to_value(QuotationResponse::from(quotation.result))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let cotation = queries::insert_cotation(
        pool,
        trip_id,
        &label,
        (
            travelers.adults as i32,
            travelers.children as i32,
            travelers.rooms as i32,
        ),
        result,
    )
    .await?;

    tracing::info!("Saved cotation {} for trip {}", cotation.id, trip_id);
    cache.invalidate_trip(trip_id).await;
    Ok(cotation)
}
