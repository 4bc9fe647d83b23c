//! Trips (circuits) and their itinerary days.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use super::condition::TripCondition;
use super::formula::{Formula, MealFlags};

/// Margin percentage applied when a trip has none configured
pub const DEFAULT_MARGIN_PCT: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Currency used when a trip or item has none configured
pub const DEFAULT_CURRENCY: &str = "EUR";

/// How the margin percentage is applied to cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginType {
    /// Margin expressed on the selling price: price = cost / (1 - m)
    #[default]
    Margin,
    /// Markup expressed on cost: price = cost * (1 + m)
    Markup,
}

impl FromStr for MarginType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "margin" => Ok(MarginType::Margin),
            "markup" => Ok(MarginType::Markup),
            other => Err(format!("unknown margin type '{}'", other)),
        }
    }
}

/// Translated name/description of a trip
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TripTranslation {
    pub locale: String,
    pub name: String,
    pub description: Option<String>,
}

/// Trip row from circuit_trips
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TripRow {
    pub id: Uuid,
    pub name: String,
    pub destination: Option<String>,
    pub margin_pct: Option<Decimal>,
    pub margin_type: Option<String>,
    pub vat_pct: Option<Decimal>,
    pub currency: Option<String>,
    pub commission_pct: Option<Decimal>,
}

/// Trip day row from circuit_days
#[derive(Debug, Clone, FromRow)]
pub struct TripDayRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub position: i32,
    pub day_number: i32,
    pub day_end: Option<i32>,
    pub location: Option<String>,
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
}

/// One day (or day range) of an itinerary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripDay {
    pub id: Uuid,
    pub day_number: i32,
    #[serde(default)]
    pub day_end: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub meals: MealFlags,
    #[serde(default)]
    pub blocks: Vec<Formula>,
}

impl TripDay {
    /// Number of calendar days covered
    pub fn span(&self) -> i32 {
        match self.day_end {
            Some(end) if end >= self.day_number => end - self.day_number + 1,
            _ => 1,
        }
    }

    pub fn block_ids(&self) -> Vec<Uuid> {
        self.blocks.iter().map(|b| b.id).collect()
    }

    /// Meals of the day: its own flags plus those of the active accommodations
    pub fn included_meals(&self, active: &[Uuid]) -> MealFlags {
        self.blocks
            .iter()
            .filter(|b| active.contains(&b.id))
            .filter_map(|b| b.meta().and_then(|m| m.meals()))
            .fold(self.meals, MealFlags::union)
    }
}

impl TripDayRow {
    pub fn into_day(self, blocks: Vec<Formula>) -> TripDay {
        TripDay {
            id: self.id,
            day_number: self.day_number,
            day_end: self.day_end,
            location: self.location,
            meals: MealFlags {
                breakfast: self.breakfast,
                lunch: self.lunch,
                dinner: self.dinner,
            },
            blocks,
        }
    }
}

/// A multi-day circuit with its pricing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub margin_pct: Decimal,
    #[serde(default)]
    pub margin_type: MarginType,
    #[serde(with = "rust_decimal::serde::str")]
    pub vat_pct: Decimal,
    pub currency: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub commission_pct: Decimal,
    #[serde(default)]
    pub days: Vec<TripDay>,
    #[serde(default)]
    pub translations: Vec<TripTranslation>,
}

impl Trip {
    /// Build a trip from its row, applying the back-office defaults for
    /// missing settings.
    pub fn from_row(
        row: TripRow,
        days: Vec<TripDay>,
        translations: Vec<TripTranslation>,
        default_currency: &str,
        default_margin_pct: Decimal,
    ) -> Self {
        Trip {
            id: row.id,
            name: row.name,
            destination: row.destination,
            margin_pct: row
                .margin_pct
                .filter(|m| !m.is_zero())
                .unwrap_or(default_margin_pct),
            margin_type: row
                .margin_type
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            vat_pct: row.vat_pct.unwrap_or(Decimal::ZERO),
            currency: row
                .currency
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| default_currency.to_string()),
            commission_pct: row.commission_pct.unwrap_or(Decimal::ZERO),
            days,
            translations,
        }
    }

    pub fn formulas(&self) -> impl Iterator<Item = &Formula> {
        self.days.iter().flat_map(|d| d.blocks.iter())
    }

    /// Total number of calendar days, counting day ranges
    pub fn duration_days(&self) -> i32 {
        self.days.iter().map(TripDay::span).sum()
    }

    /// Translated name, falling back to the base name
    pub fn name_in(&self, locale: &str) -> &str {
        self.translations
            .iter()
            .find(|t| t.locale == locale)
            .map(|t| t.name.as_str())
            .unwrap_or(&self.name)
    }
}

/// A trip together with the conditions activated on it, as cached for pricing
#[derive(Debug, Clone)]
pub struct TripSnapshot {
    pub trip: Trip,
    pub conditions: Vec<TripCondition>,
}
