//! Planner route handlers

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::quotation::services;
use crate::AppState;

use super::dispatch::{apply_drop, DropOutcome};
use super::draft::{DayLayout, ItineraryDraft};
use super::moves::{DragPayload, DropTarget};
use super::store::PgItineraryStore;

/// A drag-and-drop event from the circuit editor
#[derive(Debug, Deserialize)]
pub struct DropRequest {
    pub active: DragPayload,
    pub over: DropTarget,
}

#[derive(Debug, Serialize)]
pub struct DropResponse {
    pub outcome: DropOutcome,
    /// Itinerary layout after the drop (restored on failure)
    pub days: Vec<DayLayout>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/trips/:trip_id/planner/drop", post(handle_drop))
}

/// POST /api/trips/:trip_id/planner/drop
async fn handle_drop(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<DropRequest>,
) -> Result<Json<DropResponse>> {
    let snapshot = services::load_trip(&state.db, &state.cache, &state.config, trip_id).await?;
    let mut draft = ItineraryDraft::from_trip(&snapshot.trip);

    let store = PgItineraryStore::new(state.db.clone());
    let outcome = apply_drop(&store, &mut draft, &req.active, &req.over).await;

    if outcome.is_applied() {
        state.cache.invalidate_trip(trip_id).await;
    }

    Ok(Json(DropResponse {
        outcome,
        days: draft.days,
    }))
}
