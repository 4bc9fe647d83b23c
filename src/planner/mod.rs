//! Itinerary planner: drag-and-drop reconciliation and dispatch.
//!
//! A drop in the circuit editor is reconciled into one of five mutations
//! (reorder blocks, move block, reorder days, duplicate block, copy day),
//! applied optimistically to an [`ItineraryDraft`] and then to the store.

pub mod dispatch;
pub mod draft;
pub mod moves;
pub mod routes;
pub mod store;

pub use dispatch::{apply_drop, DropOutcome, ItineraryMutations, PlannerError};
pub use draft::{DayLayout, ItineraryDraft};
pub use moves::{array_move, reconcile, DragPayload, DropTarget, MoveOperation};
pub use routes::router;
pub use store::PgItineraryStore;
