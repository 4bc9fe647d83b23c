//! Router-level tests for the inline quotation endpoint.
//!
//! The pool is created lazily and never connected: the calculate endpoint
//! does not touch the database.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use circuit_desk::config::Config;
use circuit_desk::{app, AppState};

fn test_state() -> AppState {
    let config = Config {
        database_url: "postgres://localhost/circuit_desk_test".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        default_currency: "EUR".to_string(),
        default_margin_pct: dec!(30),
        trip_cache_ttl: Duration::from_secs(60),
    };
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();
    AppState::new(pool, config)
}

async fn post_json(uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app(test_state())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn amount(value: &serde_json::Value) -> Decimal {
    value["amount"].as_str().unwrap().parse().unwrap()
}

fn dinner(cost: &str, ratio: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": uuid::Uuid::new_v4(),
        "name": "Dinner at the riad",
        "unit_cost": cost,
        "currency": "EUR",
        "quantity": "1",
        "ratio": ratio
    })
}

// ====== calculate endpoint tests ======

#[tokio::test]
async fn test_calculate_markup_quotation() {
    let body = serde_json::json!({
        "items": [dinner("100", serde_json::json!({"ratio_type": "per_person"}))],
        "travelers": {"adults": 3},
        "margin_pct": "20",
        "margin_type": "markup"
    });

    let (status, json) = post_json("/api/quotations/calculate", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&json["total_cost"]), dec!(300));
    assert_eq!(amount(&json["selling_price"]), dec!(360));
    assert_eq!(amount(&json["price_per_person"]), dec!(120));
    assert_eq!(json["selling_price"]["currency"], "EUR");
}

#[tokio::test]
async fn test_calculate_uses_default_margin() {
    let body = serde_json::json!({
        "items": [dinner("70", serde_json::json!({"ratio_type": "per_group"}))],
        "travelers": {"adults": 2}
    });

    let (status, json) = post_json("/api/quotations/calculate", body).await;

    assert_eq!(status, StatusCode::OK);
    // 70 / (1 - 0.30)
    assert_eq!(amount(&json["selling_price"]), dec!(100));
}

#[tokio::test]
async fn test_calculate_rejects_full_margin() {
    let body = serde_json::json!({
        "items": [dinner("50", serde_json::json!({"ratio_type": "per_person"}))],
        "travelers": {"adults": 2},
        "margin_pct": "100"
    });

    let (status, json) = post_json("/api/quotations/calculate", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error_type"], "quotation_error");
}

#[tokio::test]
async fn test_calculate_reports_missing_exchange_rate() {
    let mut item = dinner("400", serde_json::json!({"ratio_type": "per_group"}));
    item["currency"] = "MAD".into();
    let body = serde_json::json!({
        "items": [item],
        "travelers": {"adults": 2}
    });

    let (status, json) = post_json("/api/quotations/calculate", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["details"]["from"], "MAD");
}

#[tokio::test]
async fn test_calculate_rejects_oversized_group() {
    let body = serde_json::json!({
        "items": [dinner("10", serde_json::json!({"ratio_type": "per_person"}))],
        "travelers": {"adults": 4294967295u32, "children": 1}
    });

    let (status, json) = post_json("/api/quotations/calculate", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error_type"], "quotation_error");
}

#[tokio::test]
async fn test_calculate_rejects_negative_exchange_rate() {
    let body = serde_json::json!({
        "items": [dinner("10", serde_json::json!({"ratio_type": "per_group"}))],
        "travelers": {"adults": 2},
        "exchange_rates": {"MAD": "-0.09"}
    });

    let (status, json) = post_json("/api/quotations/calculate", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "bad_request");
}
