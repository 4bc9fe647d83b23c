//! Domain models for circuits, their pricing and invoicing.

pub mod condition;
pub mod cotation;
pub mod formula;
pub mod invoice;
pub mod item;
pub mod trip;

pub use condition::{ConditionOption, ConditionSelection, TripCondition};
pub use cotation::Cotation;
pub use formula::{BlockKind, BlockMeta, Formula, MealFlags};
pub use invoice::{Invoice, InvoiceLine, InvoiceStatus};
pub use item::{Item, PaymentFlow, RatioCategory, RatioRule, RatioType};
pub use trip::{MarginType, Trip, TripDay, TripSnapshot};
