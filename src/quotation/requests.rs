//! Request DTOs for quotation API endpoints.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::AppError;
use crate::models::item::Item;
use crate::models::trip::MarginType;

use super::calculators::{ExchangeRates, MarginSettings, QuotationError, Travelers};

/// Travelling group in a request
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TravelersRequest {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub rooms: Option<u32>,
}

impl TravelersRequest {
    /// Rooms default to one double room per two travellers
    pub fn to_travelers(self) -> Result<Travelers, QuotationError> {
        let pax = self
            .adults
            .checked_add(self.children)
            .ok_or_else(|| {
                QuotationError::TooManyTravelers(u64::from(self.adults) + u64::from(self.children))
            })?;
        Travelers::new(
            self.adults,
            self.children,
            self.rooms.unwrap_or_else(|| pax.div_ceil(2)),
        )
        .validate()
    }
}

/// Request to calculate an inline quotation
#[derive(Debug, Deserialize)]
pub struct CalculateQuotationRequest {
    pub items: Vec<Item>,
    pub travelers: TravelersRequest,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub margin_pct: Option<Decimal>,
    #[serde(default)]
    pub margin_type: MarginType,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub vat_pct: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub commission_pct: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_rates: HashMap<String, Decimal>,
}

impl CalculateQuotationRequest {
    pub fn settings(&self) -> MarginSettings {
        MarginSettings::new(self.margin_pct.unwrap_or(Decimal::ZERO), self.margin_type)
            .with_vat(self.vat_pct.unwrap_or(Decimal::ZERO))
            .with_commission(self.commission_pct.unwrap_or(Decimal::ZERO))
    }
}

/// Request to quote a stored trip
#[derive(Debug, Deserialize)]
pub struct TripQuotationRequest {
    pub travelers: TravelersRequest,
    #[serde(default)]
    pub exchange_rates: HashMap<String, Decimal>,
    /// Locale the trip name is returned in
    #[serde(default)]
    pub locale: Option<String>,
}

/// Request to save a cotation snapshot
#[derive(Debug, Deserialize)]
pub struct SaveCotationRequest {
    #[serde(default)]
    pub label: Option<String>,
    pub travelers: TravelersRequest,
    #[serde(default)]
    pub exchange_rates: HashMap<String, Decimal>,
}

/// Build the rate table of a request; every rate must be positive
pub fn exchange_rates(rates: &HashMap<String, Decimal>) -> Result<ExchangeRates, AppError> {
    let mut table = ExchangeRates::new();
    for (currency, rate) in rates {
        if *rate <= Decimal::ZERO {
            return Err(AppError::BadRequest(format!(
                "Exchange rate for {} must be positive",
                currency
            )));
        }
        table.insert(currency, *rate);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_calculate_request_deserializes() {
        let body = r#"{
            "items": [{
                "id": "6f1c2f7e-8a52-4c1e-9a8e-3f3f0d7c9b11",
                "name": "Desert camp",
                "unit_cost": "95.50",
                "currency": "EUR",
                "quantity": "1",
                "ratio": {"ratio_type": "per_person"}
            }],
            "travelers": {"adults": 3},
            "margin_pct": "25",
            "margin_type": "markup",
            "exchange_rates": {"MAD": "0.092"}
        }"#;

        let request: CalculateQuotationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.items[0].unit_cost, dec!(95.50));
        assert_eq!(request.settings().margin_pct, dec!(25));
        assert_eq!(request.settings().margin_type, MarginType::Markup);
        assert_eq!(request.travelers.to_travelers(), Ok(Travelers::new(3, 0, 2)));
        assert_eq!(request.exchange_rates["MAD"], dec!(0.092));
    }

    #[test]
    fn test_missing_margin_uses_default() {
        let body = r#"{"items": [], "travelers": {"adults": 2, "rooms": 2}}"#;
        let request: CalculateQuotationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.settings().margin_pct, dec!(30));
        assert_eq!(request.settings().margin_type, MarginType::Margin);
    }

    #[test]
    fn test_oversized_group_is_rejected() {
        let travelers = TravelersRequest {
            adults: u32::MAX,
            children: 1,
            rooms: None,
        };
        assert_eq!(
            travelers.to_travelers(),
            Err(QuotationError::TooManyTravelers(u64::from(u32::MAX) + 1))
        );

        let travelers = TravelersRequest {
            adults: 20_000,
            children: 0,
            rooms: Some(1),
        };
        assert!(matches!(
            travelers.to_travelers(),
            Err(QuotationError::TooManyTravelers(20_000))
        ));
    }

    #[test]
    fn test_non_positive_exchange_rate_is_rejected() {
        let rates = HashMap::from([("MAD".to_string(), dec!(0))]);
        assert!(matches!(
            exchange_rates(&rates),
            Err(AppError::BadRequest(msg)) if msg.contains("MAD")
        ));

        let rates = HashMap::from([("mad".to_string(), dec!(0.092))]);
        let table = exchange_rates(&rates).unwrap();
        assert_eq!(table.convert(dec!(100), "MAD", "EUR"), Ok(dec!(9.200)));
    }
}
