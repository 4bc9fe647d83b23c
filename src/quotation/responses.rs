//! Response DTOs for quotation API endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::condition::VariantGroupReport;
use crate::models::cotation::Cotation;
use crate::models::formula::{BlockKind, BlockMeta, Formula, MealFlags};
use crate::models::trip::{Trip, TripDay};
use crate::models::item::{PaymentFlow, RatioType};
use crate::models::trip::MarginType;

use super::calculators::{QuotationLine, QuotationResult};

/// Money value for JSON responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoneyResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

/// One costed line
#[derive(Debug, Serialize)]
pub struct QuotationLineResponse {
    pub item_id: Uuid,
    pub name: String,
    pub ratio_type: RatioType,
    pub payment_flow: PaymentFlow,
    pub vat_included: bool,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    pub multiplier: u32,
    pub total: MoneyResponse,
}

impl From<QuotationLine> for QuotationLineResponse {
    fn from(line: QuotationLine) -> Self {
        Self {
            item_id: line.item_id,
            name: line.name,
            ratio_type: line.ratio_type,
            payment_flow: line.payment_flow,
            vat_included: line.vat_included,
            unit_cost: line.unit_cost,
            quantity: line.quantity,
            multiplier: line.multiplier,
            total: line.total,
        }
    }
}

/// Response for a quotation calculation
#[derive(Debug, Serialize)]
pub struct QuotationResponse {
    pub lines: Vec<QuotationLineResponse>,
    pub total_cost: MoneyResponse,
    pub selling_price: MoneyResponse,
    pub margin_amount: MoneyResponse,
    pub price_per_person: MoneyResponse,
    pub vat_amount: MoneyResponse,
    pub selling_price_incl_vat: MoneyResponse,
    pub commission_amount: MoneyResponse,
    pub traveler_shares: Vec<MoneyResponse>,
    pub pax: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub margin_pct: Decimal,
    pub margin_type: MarginType,
}

impl From<QuotationResult> for QuotationResponse {
    fn from(result: QuotationResult) -> Self {
        Self {
            lines: result.lines.into_iter().map(Into::into).collect(),
            total_cost: result.total_cost,
            selling_price: result.selling_price,
            margin_amount: result.margin_amount,
            price_per_person: result.price_per_person,
            vat_amount: result.vat_amount,
            selling_price_incl_vat: result.selling_price_incl_vat,
            commission_amount: result.commission_amount,
            traveler_shares: result.traveler_shares,
            pax: result.pax,
            margin_pct: result.margin_pct,
            margin_type: result.margin_type,
        }
    }
}

/// Block of the itinerary summary
#[derive(Debug, Serialize)]
pub struct BlockSummaryResponse {
    pub id: Uuid,
    pub kind: BlockKind,
    pub name: String,
    /// Whether the block is priced after variant resolution
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<BlockMeta>,
}

impl BlockSummaryResponse {
    fn new(block: &Formula, active: &[Uuid]) -> Self {
        Self {
            id: block.id,
            kind: block.kind,
            name: block.name.clone(),
            active: active.contains(&block.id),
            meta: block.meta(),
        }
    }
}

/// Day of the itinerary summary
#[derive(Debug, Serialize)]
pub struct DaySummaryResponse {
    pub day_id: Uuid,
    pub day_number: i32,
    pub day_end: Option<i32>,
    pub location: Option<String>,
    /// Day meals merged with those of the active accommodation
    pub meals: MealFlags,
    pub blocks: Vec<BlockSummaryResponse>,
}

impl DaySummaryResponse {
    pub fn new(day: &TripDay, active: &[Uuid]) -> Self {
        Self {
            day_id: day.id,
            day_number: day.day_number,
            day_end: day.day_end,
            location: day.location.clone(),
            meals: day.included_meals(active),
            blocks: day
                .blocks
                .iter()
                .map(|b| BlockSummaryResponse::new(b, active))
                .collect(),
        }
    }
}

/// Quotation of a stored trip
#[derive(Debug, Serialize)]
pub struct TripQuotationResponse {
    pub trip_id: Uuid,
    pub trip_name: String,
    pub duration_days: i32,
    /// Blocks priced after variant resolution
    pub active_formula_ids: Vec<Uuid>,
    pub days: Vec<DaySummaryResponse>,
    pub quotation: QuotationResponse,
}

impl TripQuotationResponse {
    /// Build the response, naming the trip in `locale` when a translation exists
    pub fn new(
        trip: &Trip,
        locale: Option<&str>,
        active_formula_ids: Vec<Uuid>,
        quotation: QuotationResponse,
    ) -> Self {
        let days = trip
            .days
            .iter()
            .map(|d| DaySummaryResponse::new(d, &active_formula_ids))
            .collect();

        Self {
            trip_id: trip.id,
            trip_name: locale
                .map(|l| trip.name_in(l))
                .unwrap_or(&trip.name)
                .to_string(),
            duration_days: trip.duration_days(),
            active_formula_ids,
            days,
            quotation,
        }
    }
}

/// Saved cotation summary
#[derive(Debug, Serialize)]
pub struct CotationResponse {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub label: String,
    pub adults: i32,
    pub children: i32,
    pub rooms: i32,
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<Cotation> for CotationResponse {
    fn from(c: Cotation) -> Self {
        Self {
            id: c.id,
            trip_id: c.trip_id,
            label: c.label,
            adults: c.adults,
            children: c.children,
            rooms: c.rooms,
            result: c.result,
            created_at: c.created_at,
        }
    }
}

/// Variant groups of a trip
#[derive(Debug, Serialize)]
pub struct VariantGroupsResponse {
    pub trip_id: Uuid,
    pub groups: Vec<VariantGroupReport>,
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::TripTranslation;
    use crate::quotation::calculators::{
        calculate_quotation, ExchangeRates, MarginSettings, Travelers,
    };
    use rust_decimal_macros::dec;

    fn hotel(day_id: Uuid, description: &str) -> Formula {
        Formula {
            id: Uuid::new_v4(),
            day_id,
            kind: BlockKind::Accommodation,
            name: "Kasbah".to_string(),
            description: description.to_string(),
            condition_id: None,
            condition_option_id: None,
            items: vec![],
        }
    }

    fn trip() -> Trip {
        let day_id = Uuid::new_v4();
        Trip {
            id: Uuid::new_v4(),
            name: "Grand Sud".to_string(),
            destination: None,
            margin_pct: dec!(30),
            margin_type: MarginType::Margin,
            vat_pct: dec!(0),
            currency: "EUR".to_string(),
            commission_pct: dec!(0),
            days: vec![TripDay {
                id: day_id,
                day_number: 1,
                day_end: None,
                location: Some("Skoura".to_string()),
                meals: MealFlags {
                    breakfast: true,
                    ..MealFlags::default()
                },
                blocks: vec![
                    hotel(day_id, r#"{"lunch":true}"#),
                    hotel(day_id, r#"{"nights":1,"dinner":true}"#),
                ],
            }],
            translations: vec![TripTranslation {
                locale: "fr".to_string(),
                name: "Le Grand Sud".to_string(),
                description: None,
            }],
        }
    }

    fn empty_quotation() -> QuotationResponse {
        calculate_quotation(
            [],
            &Travelers::new(2, 0, 1),
            &MarginSettings::default(),
            "EUR",
            &ExchangeRates::new(),
        )
        .unwrap()
        .into()
    }

    // ====== trip summary tests ======

    #[test]
    fn test_summary_merges_meals_of_active_accommodation_only() {
        let trip = trip();
        let active = vec![trip.days[0].blocks[1].id];

        let response = TripQuotationResponse::new(&trip, None, active, empty_quotation());

        let day = &response.days[0];
        assert_eq!(
            day.meals,
            MealFlags {
                breakfast: true,
                lunch: false,
                dinner: true,
            }
        );
        assert!(!day.blocks[0].active);
        assert!(day.blocks[1].active);
        assert!(matches!(
            day.blocks[1].meta,
            Some(BlockMeta::Accommodation { dinner: true, .. })
        ));
    }

    #[test]
    fn test_summary_uses_translated_name() {
        let trip = trip();
        let localized = TripQuotationResponse::new(&trip, Some("fr"), vec![], empty_quotation());
        let fallback = TripQuotationResponse::new(&trip, Some("de"), vec![], empty_quotation());

        assert_eq!(localized.trip_name, "Le Grand Sud");
        assert_eq!(fallback.trip_name, "Grand Sud");
    }
}
