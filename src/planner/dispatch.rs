//! Dispatch of reconciled drops to the itinerary store.
//!
//! The draft is updated before the store is called and restored when the
//! store fails, so a caller always ends up with a layout matching the server.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use super::draft::ItineraryDraft;
use super::moves::{reconcile, DragPayload, DropTarget, MoveOperation};

/// Errors raised by an itinerary store
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("Block {0} not found")]
    BlockNotFound(Uuid),

    #[error("Day {0} not found")]
    DayNotFound(Uuid),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// The five itinerary mutations a drop can trigger
#[async_trait]
pub trait ItineraryMutations: Send + Sync {
    async fn reorder_blocks(&self, day_id: Uuid, ordered_ids: &[Uuid]) -> Result<(), PlannerError>;

    async fn move_block(
        &self,
        block_id: Uuid,
        target_day_id: Uuid,
        position: usize,
    ) -> Result<(), PlannerError>;

    async fn reorder_days(&self, trip_id: Uuid, ordered_ids: &[Uuid]) -> Result<(), PlannerError>;

    /// Copy a block (with its items) into a day; returns the new block id
    async fn duplicate_block(
        &self,
        source_block_id: Uuid,
        target_day_id: Uuid,
        position: Option<usize>,
    ) -> Result<Uuid, PlannerError>;

    /// Append copies of every block of a day to another day; returns the new ids
    async fn copy_day_blocks(
        &self,
        source_day_id: Uuid,
        target_day_id: Uuid,
    ) -> Result<Vec<Uuid>, PlannerError>;
}

/// Message returned to the client when the store rejects a drop
pub const ITINERARY_UPDATE_FAILED: &str = "Itinerary update failed";

/// What happened to a drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DropOutcome {
    /// The drop maps to no change
    Ignored,
    /// The store accepted the operation
    Applied {
        operation: MoveOperation,
        /// Ids of blocks created by a copy
        created_ids: Vec<Uuid>,
    },
    /// The store rejected the operation and the draft was restored
    Reverted {
        operation: MoveOperation,
        error: String,
    },
}

impl DropOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DropOutcome::Applied { .. })
    }
}

async fn execute<S>(
    store: &S,
    trip_id: Uuid,
    operation: &MoveOperation,
) -> Result<Vec<Uuid>, PlannerError>
where
    S: ItineraryMutations + ?Sized,
{
    match operation {
        MoveOperation::ReorderBlocks {
            day_id,
            ordered_ids,
        } => store.reorder_blocks(*day_id, ordered_ids).await.map(|_| vec![]),
        MoveOperation::MoveBlock {
            block_id,
            target_day_id,
            position,
        } => store
            .move_block(*block_id, *target_day_id, *position)
            .await
            .map(|_| vec![]),
        MoveOperation::ReorderDays { ordered_ids } => {
            store.reorder_days(trip_id, ordered_ids).await.map(|_| vec![])
        }
        MoveOperation::DuplicateBlock {
            source_block_id,
            target_day_id,
            position,
        } => store
            .duplicate_block(*source_block_id, *target_day_id, *position)
            .await
            .map(|id| vec![id]),
        MoveOperation::CopyDayBlocks {
            source_day_id,
            target_day_id,
        } => store.copy_day_blocks(*source_day_id, *target_day_id).await,
    }
}

/// Reconcile a drop against the draft and dispatch it to the store.
///
/// Failures are logged and reported through [`DropOutcome::Reverted`]; they
/// are never retried.
pub async fn apply_drop<S>(
    store: &S,
    draft: &mut ItineraryDraft,
    active: &DragPayload,
    over: &DropTarget,
) -> DropOutcome
where
    S: ItineraryMutations + ?Sized,
{
    let Some(operation) = reconcile(draft, active, over) else {
        tracing::debug!("Drop {:?} onto {:?} ignored", active, over);
        return DropOutcome::Ignored;
    };

    let snapshot = draft.clone();
    draft.apply(&operation);

    match execute(store, draft.trip_id, &operation).await {
        Ok(created_ids) => {
            match &operation {
                MoveOperation::DuplicateBlock {
                    target_day_id,
                    position,
                    ..
                } => draft.insert_blocks(*target_day_id, *position, &created_ids),
                MoveOperation::CopyDayBlocks { target_day_id, .. } => {
                    draft.insert_blocks(*target_day_id, None, &created_ids)
                }
                _ => {}
            }
            tracing::info!(
                "Applied {} on trip {} ({} blocks created)",
                operation.name(),
                draft.trip_id,
                created_ids.len()
            );
            DropOutcome::Applied {
                operation,
                created_ids,
            }
        }
        Err(e) => {
            tracing::error!(
                "Failed to apply {} on trip {}: {}",
                operation.name(),
                draft.trip_id,
                e
            );
            *draft = snapshot;
            DropOutcome::Reverted {
                operation,
                error: ITINERARY_UPDATE_FAILED.to_string(),
            }
        }
    }
}
