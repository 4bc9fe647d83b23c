//! Quotation engine for circuits.
//!
//! Prices the cost items of a trip for a travelling group: ratio resolution,
//! currency conversion, margin or markup, VAT and agency commission.

pub mod calculators;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;

pub use calculators::{
    allocate_shared_costs, calculate_quotation, round_money, ExchangeRates, MarginSettings,
    QuotationError, QuotationResult, Travelers,
};
pub use routes::router;
pub use services::{quote_trip, TripQuotation};
