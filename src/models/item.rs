//! Costed line items and their ratio rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// How an item's base cost scales with the travelling group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioType {
    PerPerson,
    PerRoom,
    PerVehicle,
    PerGroup,
}

impl RatioType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatioType::PerPerson => "per_person",
            RatioType::PerRoom => "per_room",
            RatioType::PerVehicle => "per_vehicle",
            RatioType::PerGroup => "per_group",
        }
    }
}

impl FromStr for RatioType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_person" => Ok(RatioType::PerPerson),
            "per_room" => Ok(RatioType::PerRoom),
            "per_vehicle" => Ok(RatioType::PerVehicle),
            "per_group" => Ok(RatioType::PerGroup),
            other => Err(format!("unknown ratio type '{}'", other)),
        }
    }
}

/// Traveler category an item applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioCategory {
    #[default]
    All,
    Adult,
    Child,
}

impl FromStr for RatioCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(RatioCategory::All),
            "adult" => Ok(RatioCategory::Adult),
            "child" => Ok(RatioCategory::Child),
            other => Err(format!("unknown ratio category '{}'", other)),
        }
    }
}

/// Multiplier policy applied to `unit_cost * quantity`.
///
/// `per` is the optional "1 per N" divisor: one unit is charged for every
/// started group of N (a guide per 8 travellers, a jeep per 4 seats).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioRule {
    pub ratio_type: RatioType,
    #[serde(default)]
    pub per: Option<u32>,
    #[serde(default)]
    pub category: RatioCategory,
}

impl RatioRule {
    pub fn per_person() -> Self {
        Self {
            ratio_type: RatioType::PerPerson,
            per: None,
            category: RatioCategory::All,
        }
    }

    pub fn new(ratio_type: RatioType) -> Self {
        Self {
            ratio_type,
            per: None,
            category: RatioCategory::All,
        }
    }

    pub fn one_per(mut self, n: u32) -> Self {
        self.per = Some(n);
        self
    }

    pub fn for_category(mut self, category: RatioCategory) -> Self {
        self.category = category;
        self
    }
}

/// Who collects the money for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFlow {
    #[default]
    Agency,
    SupplierDirect,
    OnSite,
}

impl FromStr for PaymentFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agency" => Ok(PaymentFlow::Agency),
            "supplier_direct" => Ok(PaymentFlow::SupplierDirect),
            "on_site" => Ok(PaymentFlow::OnSite),
            other => Err(format!("unknown payment flow '{}'", other)),
        }
    }
}

/// One costed line of a formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_cost: Decimal,
    pub currency: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    pub ratio: RatioRule,
    #[serde(default)]
    pub payment_flow: PaymentFlow,
    #[serde(default)]
    pub vat_included: bool,
}

/// Item row from circuit_items
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: Uuid,
    pub formula_id: Uuid,
    pub name: String,
    pub unit_cost: Decimal,
    pub currency: Option<String>,
    pub quantity: Decimal,
    pub ratio_type: String,
    pub ratio_per: Option<i32>,
    pub ratio_category: Option<String>,
    pub payment_flow: Option<String>,
    pub vat_included: bool,
    pub position: i32,
}

impl ItemRow {
    /// Convert into the domain item, falling back to defaults for
    /// unparseable tags.
    pub fn into_item(self, default_currency: &str) -> Item {
        let ratio_type = self.ratio_type.parse().unwrap_or_else(|e| {
            tracing::warn!("Item {}: {}, using per_person", self.id, e);
            RatioType::PerPerson
        });
        let category = self
            .ratio_category
            .as_deref()
            .unwrap_or("")
            .parse()
            .unwrap_or_default();
        let payment_flow = self
            .payment_flow
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Item {
            id: self.id,
            name: self.name,
            unit_cost: self.unit_cost,
            currency: self
                .currency
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| default_currency.to_string()),
            quantity: self.quantity,
            ratio: RatioRule {
                ratio_type,
                per: self.ratio_per.filter(|n| *n > 0).map(|n| n as u32),
                category,
            },
            payment_flow,
            vat_included: self.vat_included,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(ratio_type: &str) -> ItemRow {
        ItemRow {
            id: Uuid::new_v4(),
            formula_id: Uuid::new_v4(),
            name: "Guide".to_string(),
            unit_cost: dec!(120),
            currency: None,
            quantity: dec!(1),
            ratio_type: ratio_type.to_string(),
            ratio_per: Some(8),
            ratio_category: Some("adult".to_string()),
            payment_flow: Some("on_site".to_string()),
            vat_included: true,
            position: 0,
        }
    }

    #[test]
    fn test_row_into_item_parses_tags() {
        let item = row("per_group").into_item("EUR");
        assert_eq!(item.ratio.ratio_type, RatioType::PerGroup);
        assert_eq!(item.ratio.per, Some(8));
        assert_eq!(item.ratio.category, RatioCategory::Adult);
        assert_eq!(item.payment_flow, PaymentFlow::OnSite);
        assert_eq!(item.currency, "EUR");
    }

    #[test]
    fn test_row_into_item_unknown_ratio_falls_back() {
        let item = row("per_camel").into_item("MAD");
        assert_eq!(item.ratio.ratio_type, RatioType::PerPerson);
        assert_eq!(item.currency, "MAD");
    }

    #[test]
    fn test_ratio_rule_deserializes_with_defaults() {
        let rule: RatioRule = serde_json::from_str(r#"{"ratio_type":"per_vehicle"}"#).unwrap();
        assert_eq!(rule, RatioRule::new(RatioType::PerVehicle));
    }
}
