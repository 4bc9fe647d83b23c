//! Invoices attached to a trip and their status workflow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::quotation::calculators::round_money;

/// Invoice lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Draft, InvoiceStatus::Sent)
                | (InvoiceStatus::Draft, InvoiceStatus::Cancelled)
                | (InvoiceStatus::Sent, InvoiceStatus::Paid)
                | (InvoiceStatus::Sent, InvoiceStatus::Cancelled)
        )
    }

    /// Validate a transition, returning the new status
    pub fn transition(self, next: InvoiceStatus) -> Result<InvoiceStatus, InvoiceError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvoiceError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(InvoiceError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvoiceError {
    #[error("Invoice cannot go from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    #[error("Unknown invoice status '{0}'")]
    UnknownStatus(String),
}

/// Invoice row from circuit_invoices
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invoice {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub number: String,
    pub status: String,
    pub currency: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Invoice line from circuit_invoice_lines
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub label: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub vat_pct: Decimal,
}

impl InvoiceLine {
    pub fn net(&self) -> Decimal {
        round_money(self.quantity * self.unit_price, 2)
    }

    pub fn vat(&self) -> Decimal {
        round_money(self.net() * self.vat_pct / Decimal::ONE_HUNDRED, 2)
    }
}

/// Aggregated invoice amounts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceTotals {
    #[serde(with = "rust_decimal::serde::str")]
    pub net: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub vat: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub gross: Decimal,
}

pub fn invoice_totals(lines: &[InvoiceLine]) -> InvoiceTotals {
    let net: Decimal = lines.iter().map(InvoiceLine::net).sum();
    let vat: Decimal = lines.iter().map(InvoiceLine::vat).sum();
    InvoiceTotals {
        net,
        vat,
        gross: net + vat,
    }
}
