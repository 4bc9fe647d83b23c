//! Invoice route handlers

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, Result};
use crate::models::invoice::{invoice_totals, InvoiceTotals};
use crate::models::{Invoice, InvoiceLine, InvoiceStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
    pub totals: InvoiceTotals,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/invoices/:invoice_id", get(get_invoice))
        .route("/api/invoices/:invoice_id/status", post(update_status))
}

async fn with_lines(state: &AppState, invoice: Invoice) -> Result<InvoiceResponse> {
    let lines = db::get_invoice_lines(&state.db, invoice.id).await?;
    let totals = invoice_totals(&lines);
    Ok(InvoiceResponse {
        invoice,
        lines,
        totals,
    })
}

/// GET /api/invoices/:invoice_id
async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>> {
    let invoice = db::get_invoice(&state.db, invoice_id)
        .await?
        .ok_or(AppError::NotFound("Invoice"))?;

    Ok(Json(with_lines(&state, invoice).await?))
}

/// POST /api/invoices/:invoice_id/status
async fn update_status(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<InvoiceResponse>> {
    let next: InvoiceStatus = req.status.parse()?;

    let invoice = db::get_invoice(&state.db, invoice_id)
        .await?
        .ok_or(AppError::NotFound("Invoice"))?;
    let current: InvoiceStatus = invoice.status.parse()?;
    current.transition(next)?;

    let updated = db::update_invoice_status(&state.db, invoice_id, current.as_str(), next.as_str())
        .await?
        .ok_or_else(|| {
            tracing::warn!("Invoice {} changed status concurrently", invoice_id);
            AppError::Conflict(format!("Invoice {} was modified concurrently", invoice_id))
        })?;

    tracing::info!("Invoice {} moved from {} to {}", invoice_id, current, next);
    Ok(Json(with_lines(&state, updated).await?))
}
