//! Cotations: saved quotation snapshots of a trip.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Cotation from circuit_cotations
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Cotation {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub label: String,
    pub adults: i32,
    pub children: i32,
    pub rooms: i32,
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
