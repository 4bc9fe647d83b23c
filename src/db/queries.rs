//! Database queries for trips, conditions, cotations and invoices

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::models::formula::FormulaRow;
use crate::models::item::ItemRow;
use crate::models::trip::{TripDayRow, TripRow, TripTranslation};
use crate::models::{
    ConditionOption, Cotation, Formula, Invoice, InvoiceLine, Trip, TripCondition, TripSnapshot,
};

/// Get a trip row by id
pub async fn get_trip_row(pool: &PgPool, trip_id: Uuid) -> Result<Option<TripRow>> {
    let trip = sqlx::query_as::<_, TripRow>(
        r#"
        SELECT id, name, destination, margin_pct, margin_type,
               vat_pct, currency, commission_pct
        FROM circuit_trips
        WHERE id = $1
          AND deleted_at IS NULL
        "#,
    )
    .bind(trip_id)
    .fetch_optional(pool)
    .await?;

    Ok(trip)
}

/// Get the days of a trip in itinerary order
pub async fn get_trip_days(pool: &PgPool, trip_id: Uuid) -> Result<Vec<TripDayRow>> {
    let days = sqlx::query_as::<_, TripDayRow>(
        r#"
        SELECT id, trip_id, position, day_number, day_end, location,
               breakfast, lunch, dinner
        FROM circuit_days
        WHERE trip_id = $1
        ORDER BY position, day_number
        "#,
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;

    Ok(days)
}

/// Get every formula of a trip, ordered within their day
pub async fn get_trip_formulas(pool: &PgPool, trip_id: Uuid) -> Result<Vec<FormulaRow>> {
    let formulas = sqlx::query_as::<_, FormulaRow>(
        r#"
        SELECT f.id, f.day_id, f.kind, f.name, f.description,
               f.condition_id, f.condition_option_id, f.position
        FROM circuit_formulas f
        JOIN circuit_days d ON d.id = f.day_id
        WHERE d.trip_id = $1
        ORDER BY f.position, f.id
        "#,
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;

    Ok(formulas)
}

/// Get every item of a trip, ordered within their formula
pub async fn get_trip_items(pool: &PgPool, trip_id: Uuid) -> Result<Vec<ItemRow>> {
    let items = sqlx::query_as::<_, ItemRow>(
        r#"
        SELECT i.id, i.formula_id, i.name, i.unit_cost, i.currency, i.quantity,
               i.ratio_type, i.ratio_per, i.ratio_category, i.payment_flow,
               i.vat_included, i.position
        FROM circuit_items i
        JOIN circuit_formulas f ON f.id = i.formula_id
        JOIN circuit_days d ON d.id = f.day_id
        WHERE d.trip_id = $1
        ORDER BY i.position, i.id
        "#,
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

/// Get the translations of a trip
pub async fn get_trip_translations(pool: &PgPool, trip_id: Uuid) -> Result<Vec<TripTranslation>> {
    let translations = sqlx::query_as::<_, TripTranslation>(
        r#"
        SELECT locale, name, description
        FROM circuit_trip_translations
        WHERE trip_id = $1
        ORDER BY locale
        "#,
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;

    Ok(translations)
}

/// Get the conditions activated on a trip
pub async fn get_trip_conditions(pool: &PgPool, trip_id: Uuid) -> Result<Vec<TripCondition>> {
    let conditions = sqlx::query_as::<_, TripCondition>(
        r#"
        SELECT trip_id, condition_id, selected_option_id
        FROM circuit_trip_conditions
        WHERE trip_id = $1
        "#,
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;

    Ok(conditions)
}

/// Get all condition options of the tenant (for cache warming)
pub async fn get_condition_options(pool: &PgPool) -> Result<Vec<ConditionOption>> {
    let options = sqlx::query_as::<_, ConditionOption>(
        r#"
        SELECT o.id, o.condition_id, o.label, o.position
        FROM circuit_condition_options o
        JOIN circuit_conditions c ON c.id = o.condition_id
        ORDER BY o.condition_id, o.position
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(options)
}

/// Nest formulas and items under their days
pub fn assemble_days(
    days: Vec<TripDayRow>,
    formulas: Vec<FormulaRow>,
    items: Vec<ItemRow>,
    default_currency: &str,
) -> Vec<crate::models::TripDay> {
    let mut items_by_formula: HashMap<Uuid, Vec<_>> = HashMap::new();
    for item in items {
        items_by_formula
            .entry(item.formula_id)
            .or_default()
            .push(item.into_item(default_currency));
    }

    let mut formulas_by_day: HashMap<Uuid, Vec<Formula>> = HashMap::new();
    for formula in formulas {
        let items = items_by_formula.remove(&formula.id).unwrap_or_default();
        formulas_by_day
            .entry(formula.day_id)
            .or_default()
            .push(formula.into_formula(items));
    }

    days.into_iter()
        .map(|day| {
            let blocks = formulas_by_day.remove(&day.id).unwrap_or_default();
            day.into_day(blocks)
        })
        .collect()
}

/// Load a trip with its days, blocks, items and activated conditions
pub async fn load_trip(
    pool: &PgPool,
    trip_id: Uuid,
    default_currency: &str,
    default_margin_pct: Decimal,
) -> Result<Option<TripSnapshot>> {
    let Some(row) = get_trip_row(pool, trip_id).await? else {
        return Ok(None);
    };

    let days = get_trip_days(pool, trip_id).await?;
    let formulas = get_trip_formulas(pool, trip_id).await?;
    let items = get_trip_items(pool, trip_id).await?;
    let translations = get_trip_translations(pool, trip_id).await?;
    let conditions = get_trip_conditions(pool, trip_id).await?;

    let days = assemble_days(days, formulas, items, default_currency);
    let trip = Trip::from_row(row, days, translations, default_currency, default_margin_pct);

    Ok(Some(TripSnapshot { trip, conditions }))
}

/// Save a cotation snapshot
pub async fn insert_cotation(
    pool: &PgPool,
    trip_id: Uuid,
    label: &str,
    (adults, children, rooms): (i32, i32, i32),
    result: serde_json::Value,
) -> Result<Cotation> {
    let cotation = sqlx::query_as::<_, Cotation>(
        r#"
        INSERT INTO circuit_cotations
            (id, trip_id, label, adults, children, rooms, result, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, trip_id, label, adults, children, rooms, result, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(trip_id)
    .bind(label)
    .bind(adults)
    .bind(children)
    .bind(rooms)
    .bind(result)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(cotation)
}

/// List the cotations of a trip, newest first
pub async fn list_cotations(pool: &PgPool, trip_id: Uuid) -> Result<Vec<Cotation>> {
    let cotations = sqlx::query_as::<_, Cotation>(
        r#"
        SELECT id, trip_id, label, adults, children, rooms, result, created_at
        FROM circuit_cotations
        WHERE trip_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;

    Ok(cotations)
}

/// Get an invoice by id
pub async fn get_invoice(pool: &PgPool, invoice_id: Uuid) -> Result<Option<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, trip_id, number, status, currency, issued_at, created_at
        FROM circuit_invoices
        WHERE id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(pool)
    .await?;

    Ok(invoice)
}

/// Get the lines of an invoice
pub async fn get_invoice_lines(pool: &PgPool, invoice_id: Uuid) -> Result<Vec<InvoiceLine>> {
    let lines = sqlx::query_as::<_, InvoiceLine>(
        r#"
        SELECT label, quantity, unit_price, vat_pct
        FROM circuit_invoice_lines
        WHERE invoice_id = $1
        ORDER BY position
        "#,
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await?;

    Ok(lines)
}

/// Update an invoice status if it still has the expected one.
///
/// Returns `None` when another writer changed the status first.
pub async fn update_invoice_status(
    pool: &PgPool,
    invoice_id: Uuid,
    expected: &str,
    next: &str,
) -> Result<Option<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>(
        r#"
        UPDATE circuit_invoices
        SET status = $3,
            issued_at = CASE WHEN $3 = 'sent' THEN NOW() ELSE issued_at END
        WHERE id = $1 AND status = $2
        RETURNING id, trip_id, number, status, currency, issued_at, created_at
        "#,
    )
    .bind(invoice_id)
    .bind(expected)
    .bind(next)
    .fetch_optional(pool)
    .await?;

    Ok(invoice)
}
