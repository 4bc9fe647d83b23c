//! Quotation API route handlers

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::error::Result;
use crate::AppState;

use super::calculators::calculate_quotation;
use super::requests::{
    exchange_rates, CalculateQuotationRequest, SaveCotationRequest, TripQuotationRequest,
};
use super::responses::{
    CotationResponse, QuotationResponse, TripQuotationResponse, VariantGroupsResponse,
};
use super::services;

/// Create quotation router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/quotations/calculate", post(calculate))
        .route("/api/trips/:trip_id/quotation", post(quote_trip))
        .route(
            "/api/trips/:trip_id/cotations",
            post(save_cotation).get(list_cotations),
        )
        .route("/api/trips/:trip_id/variant-groups", get(variant_groups))
}

/// POST /api/quotations/calculate
async fn calculate(
    State(state): State<AppState>,
    Json(req): Json<CalculateQuotationRequest>,
) -> Result<Json<QuotationResponse>> {
    let currency = req
        .currency
        .clone()
        .unwrap_or_else(|| state.config.default_currency.clone());

    let result = calculate_quotation(
        &req.items,
        &req.travelers.to_travelers()?,
        &req.settings(),
        &currency,
        &exchange_rates(&req.exchange_rates)?,
    )?;

    Ok(Json(result.into()))
}

/// POST /api/trips/:trip_id/quotation
async fn quote_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<TripQuotationRequest>,
) -> Result<Json<TripQuotationResponse>> {
    let snapshot = services::load_trip(&state.db, &state.cache, &state.config, trip_id).await?;
    let quotation = services::quote_trip(
        &snapshot,
        &req.travelers.to_travelers()?,
        &exchange_rates(&req.exchange_rates)?,
    )?;

    Ok(Json(TripQuotationResponse::new(
        &snapshot.trip,
        req.locale.as_deref(),
        quotation.active_formula_ids,
        quotation.result.into(),
    )))
}

/// POST /api/trips/:trip_id/cotations
async fn save_cotation(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<SaveCotationRequest>,
) -> Result<Json<CotationResponse>> {
    let cotation = services::save_cotation(
        &state.db,
        &state.cache,
        &state.config,
        trip_id,
        req.label,
        req.travelers.to_travelers()?,
        &exchange_rates(&req.exchange_rates)?,
    )
    .await?;

    Ok(Json(cotation.into()))
}

/// GET /api/trips/:trip_id/cotations
async fn list_cotations(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Vec<CotationResponse>>> {
    // 404 for unknown trips rather than an empty list
    services::load_trip(&state.db, &state.cache, &state.config, trip_id).await?;
    let cotations = crate::db::list_cotations(&state.db, trip_id).await?;
    Ok(Json(cotations.into_iter().map(Into::into).collect()))
}

/// GET /api/trips/:trip_id/variant-groups
async fn variant_groups(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<VariantGroupsResponse>> {
    let snapshot = services::load_trip(&state.db, &state.cache, &state.config, trip_id).await?;
    let groups = services::variant_groups(&state.db, &state.cache, &snapshot).await?;

    for group in groups.iter().filter(|g| !g.is_consistent()) {
        tracing::warn!(
            "Trip {} has an inconsistent variant group for condition {}",
            trip_id,
            group.condition_id
        );
    }

    Ok(Json(VariantGroupsResponse { trip_id, groups }))
}
