//! Core quotation calculation functions.
//!
//! Pure functions for pricing math - no database access.

use rust_decimal::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::item::{Item, PaymentFlow, RatioCategory, RatioRule, RatioType};
use crate::models::trip::{MarginType, DEFAULT_MARGIN_PCT};
use crate::quotation::responses::MoneyResponse;

/// Seats per vehicle when a per-vehicle item has no explicit divisor
pub const DEFAULT_VEHICLE_CAPACITY: u32 = 4;

/// Largest travelling group a quotation accepts
pub const MAX_TRAVELERS: u32 = 10_000;

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities. This reduces cumulative rounding bias.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use circuit_desk::quotation::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Quotation errors. Everything else in the calculator degrades to zero.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuotationError {
    #[error("Margin of {0}% leaves no selling price (must be below 100% in margin mode)")]
    MarginOutOfRange(Decimal),

    #[error("No exchange rate from {from} to {to}")]
    MissingExchangeRate { from: String, to: String },

    #[error("A group of {0} travellers is not supported (at most {max})", max = MAX_TRAVELERS)]
    TooManyTravelers(u64),

    #[error("Quotation amounts exceed the supported range")]
    AmountOverflow,
}

/// Travelling group the quotation is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Travelers {
    pub adults: u32,
    pub children: u32,
    pub rooms: u32,
}

impl Travelers {
    pub fn new(adults: u32, children: u32, rooms: u32) -> Self {
        Self {
            adults,
            children,
            rooms,
        }
    }

    pub fn pax(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }

    /// Reject groups larger than [`MAX_TRAVELERS`] (rooms included)
    pub fn validate(self) -> Result<Self, QuotationError> {
        let pax = u64::from(self.adults) + u64::from(self.children);
        let largest = pax.max(u64::from(self.rooms));
        if largest > u64::from(MAX_TRAVELERS) {
            return Err(QuotationError::TooManyTravelers(largest));
        }
        Ok(self)
    }

    fn count(&self, category: RatioCategory) -> u32 {
        match category {
            RatioCategory::All => self.pax(),
            RatioCategory::Adult => self.adults,
            RatioCategory::Child => self.children,
        }
    }
}

/// Margin, VAT and commission settings of a quotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginSettings {
    pub margin_pct: Decimal,
    pub margin_type: MarginType,
    pub vat_pct: Decimal,
    pub commission_pct: Decimal,
}

impl MarginSettings {
    /// Margin settings with the back-office default applied when `margin_pct`
    /// is zero.
    pub fn new(margin_pct: Decimal, margin_type: MarginType) -> Self {
        Self {
            margin_pct: if margin_pct.is_zero() {
                DEFAULT_MARGIN_PCT
            } else {
                margin_pct
            },
            margin_type,
            vat_pct: Decimal::ZERO,
            commission_pct: Decimal::ZERO,
        }
    }

    pub fn with_vat(mut self, vat_pct: Decimal) -> Self {
        self.vat_pct = vat_pct;
        self
    }

    pub fn with_commission(mut self, commission_pct: Decimal) -> Self {
        self.commission_pct = commission_pct;
        self
    }
}

impl Default for MarginSettings {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN_PCT, MarginType::Margin)
    }
}

/// Conversion rates into the quotation currency.
///
/// Each rate is the value of one unit of the keyed currency expressed in the
/// quotation currency.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRates {
    rates: HashMap<String, Decimal>,
}

impl ExchangeRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, currency: &str, rate: Decimal) -> Self {
        self.insert(currency, rate);
        self
    }

    pub fn insert(&mut self, currency: &str, rate: Decimal) {
        self.rates.insert(currency.to_ascii_uppercase(), rate);
    }

    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, QuotationError> {
        if from.is_empty() || from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }
        let rate = self
            .rates
            .get(&from.to_ascii_uppercase())
            .ok_or_else(|| QuotationError::MissingExchangeRate {
                from: from.to_string(),
                to: to.to_string(),
            })?;
        amount
            .checked_mul(*rate)
            .ok_or(QuotationError::AmountOverflow)
    }
}

fn ceil_div(count: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        return count;
    }
    count.div_ceil(divisor)
}

/// Multiplier a ratio rule applies to `unit_cost * quantity`.
///
/// - per_person: travellers of the rule's category, or ceil(count/N)
/// - per_room: rooms, or ceil(rooms/N)
/// - per_vehicle: ceil(count/N) with N defaulting to 4 seats
/// - per_group: 1
pub fn ratio_multiplier(rule: &RatioRule, travelers: &Travelers) -> u32 {
    let count = travelers.count(rule.category);
    match rule.ratio_type {
        RatioType::PerPerson => rule.per.map_or(count, |n| ceil_div(count, n)),
        RatioType::PerRoom => rule
            .per
            .map_or(travelers.rooms, |n| ceil_div(travelers.rooms, n)),
        RatioType::PerVehicle => ceil_div(count, rule.per.unwrap_or(DEFAULT_VEHICLE_CAPACITY)),
        RatioType::PerGroup => 1,
    }
}

/// Selling price for a cost under the given margin policy.
///
/// Margin mode: `cost / (1 - m)`; markup mode: `cost * (1 + m)`.
pub fn selling_price(
    cost: Decimal,
    margin_pct: Decimal,
    margin_type: MarginType,
) -> Result<Decimal, QuotationError> {
    let rate = margin_pct / Decimal::ONE_HUNDRED;
    match margin_type {
        MarginType::Margin => {
            if rate >= Decimal::ONE {
                return Err(QuotationError::MarginOutOfRange(margin_pct));
            }
            cost.checked_div(Decimal::ONE - rate)
                .ok_or(QuotationError::AmountOverflow)
        }
        MarginType::Markup => cost
            .checked_mul(Decimal::ONE + rate)
            .ok_or(QuotationError::AmountOverflow),
    }
}

/// Costed line of a quotation
#[derive(Debug, Clone)]
pub struct QuotationLine {
    pub item_id: Uuid,
    pub name: String,
    pub ratio_type: RatioType,
    pub payment_flow: PaymentFlow,
    pub vat_included: bool,
    /// Unit cost converted to the quotation currency
    pub unit_cost: Decimal,
    pub quantity: Decimal,
    pub multiplier: u32,
    pub total: MoneyResponse,
}

/// Compute a single costed line
pub fn quote_line(
    item: &Item,
    travelers: &Travelers,
    currency: &str,
    rates: &ExchangeRates,
) -> Result<QuotationLine, QuotationError> {
    let unit_cost = rates.convert(item.unit_cost, &item.currency, currency)?;
    let multiplier = ratio_multiplier(&item.ratio, travelers);
    let total = unit_cost
        .checked_mul(item.quantity)
        .and_then(|t| t.checked_mul(Decimal::from(multiplier)))
        .ok_or(QuotationError::AmountOverflow)?;

    Ok(QuotationLine {
        item_id: item.id,
        name: item.name.clone(),
        ratio_type: item.ratio.ratio_type,
        payment_flow: item.payment_flow,
        vat_included: item.vat_included,
        unit_cost,
        quantity: item.quantity,
        multiplier,
        total: MoneyResponse {
            amount: total,
            currency: currency.to_string(),
        },
    })
}

/// Result of a quotation
#[derive(Debug, Clone)]
pub struct QuotationResult {
    pub lines: Vec<QuotationLine>,
    pub total_cost: MoneyResponse,
    pub selling_price: MoneyResponse,
    pub margin_amount: MoneyResponse,
    pub price_per_person: MoneyResponse,
    pub vat_amount: MoneyResponse,
    pub selling_price_incl_vat: MoneyResponse,
    pub commission_amount: MoneyResponse,
    /// Selling price split per traveller, remainder cents on the first ones
    pub traveler_shares: Vec<MoneyResponse>,
    pub pax: u32,
    pub margin_pct: Decimal,
    pub margin_type: MarginType,
}

/// Calculate a quotation from a formula's items.
///
/// Line totals keep full precision; the aggregated amounts are rounded to
/// cents with banker's rounding.
pub fn calculate_quotation<'a, I>(
    items: I,
    travelers: &Travelers,
    settings: &MarginSettings,
    currency: &str,
    rates: &ExchangeRates,
) -> Result<QuotationResult, QuotationError>
where
    I: IntoIterator<Item = &'a Item>,
{
    let travelers = &travelers.validate()?;
    let lines = items
        .into_iter()
        .map(|item| quote_line(item, travelers, currency, rates))
        .collect::<Result<Vec<_>, _>>()?;

    let cost = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.total.amount))
        .ok_or(QuotationError::AmountOverflow)?;
    let selling = selling_price(cost, settings.margin_pct, settings.margin_type)?;

    let pax = travelers.pax();
    let per_person = if pax > 0 {
        selling / Decimal::from(pax)
    } else {
        Decimal::ZERO
    };

    let total_cost = round_money(cost, 2);
    let selling_rounded = round_money(selling, 2);
    let share_of = |pct: Decimal| {
        selling
            .checked_mul(pct / Decimal::ONE_HUNDRED)
            .map(|amount| round_money(amount, 2))
            .ok_or(QuotationError::AmountOverflow)
    };
    let vat = share_of(settings.vat_pct)?;
    let commission = share_of(settings.commission_pct)?;
    let margin_amount = selling_rounded
        .checked_sub(total_cost)
        .ok_or(QuotationError::AmountOverflow)?;
    let selling_incl_vat = selling_rounded
        .checked_add(vat)
        .ok_or(QuotationError::AmountOverflow)?;
    let shares = allocate_shared_costs(selling_rounded, pax as i32, currency);

    let money = |amount: Decimal| MoneyResponse {
        amount,
        currency: currency.to_string(),
    };

    Ok(QuotationResult {
        lines,
        total_cost: money(total_cost),
        selling_price: money(selling_rounded),
        margin_amount: money(margin_amount),
        price_per_person: money(round_money(per_person, 2)),
        vat_amount: money(vat),
        selling_price_incl_vat: money(selling_incl_vat),
        commission_amount: money(commission),
        traveler_shares: shares.amounts,
        pax,
        margin_pct: settings.margin_pct,
        margin_type: settings.margin_type,
    })
}

/// Allocate a shared amount evenly among travellers with remainder handling.
///
/// Uses banker's rounding, then distributes any remainder (due to rounding)
/// to the first N travellers in 0.01 increments.
///
/// # Arguments
/// * `shared_total` - Total amount to allocate
/// * `traveler_count` - Number of travellers to split among
/// * `currency` - Currency code (e.g., "EUR")
pub fn allocate_shared_costs(
    shared_total: Decimal,
    traveler_count: i32,
    currency: &str,
) -> AllocationResult {
    if traveler_count <= 0 {
        return AllocationResult { amounts: vec![] };
    }

    // Calculate base per-traveller amount with banker's rounding
    let per_traveler = round_money(shared_total / Decimal::from(traveler_count), 2);

    // Remainder can be positive or negative due to rounding
    let remainder = shared_total - per_traveler * Decimal::from(traveler_count);

    let mut amounts: Vec<MoneyResponse> = (0..traveler_count)
        .map(|_| MoneyResponse {
            amount: per_traveler,
            currency: currency.to_string(),
        })
        .collect();

    // Distribute remainder in 0.01 increments to first N travellers
    if remainder != Decimal::ZERO {
        let increment = if remainder > Decimal::ZERO {
            Decimal::new(1, 2) // 0.01
        } else {
            Decimal::new(-1, 2) // -0.01
        };

        let adjustments_needed = (remainder.abs() / Decimal::new(1, 2))
            .to_i32()
            .unwrap_or(0) as usize;

        for amount in amounts.iter_mut().take(adjustments_needed) {
            amount.amount += increment;
        }
    }

    AllocationResult { amounts }
}

/// Result of shared cost allocation: one amount per traveller
#[derive(Debug, Clone)]
pub struct AllocationResult {
    pub amounts: Vec<MoneyResponse>,
}
