//! In-memory layout of an itinerary: ordered days with ordered block ids.
//!
//! The draft is what drag-and-drop operations are reconciled against and
//! what gets updated optimistically before the store confirms.

use serde::Serialize;
use uuid::Uuid;

use crate::models::trip::Trip;

use super::moves::{array_move, MoveOperation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayLayout {
    pub day_id: Uuid,
    pub block_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ItineraryDraft {
    pub trip_id: Uuid,
    pub days: Vec<DayLayout>,
}

impl ItineraryDraft {
    pub fn new(trip_id: Uuid, days: Vec<DayLayout>) -> Self {
        Self { trip_id, days }
    }

    /// Reset the draft from the server copy of the trip
    pub fn from_trip(trip: &Trip) -> Self {
        Self {
            trip_id: trip.id,
            days: trip
                .days
                .iter()
                .map(|d| DayLayout {
                    day_id: d.id,
                    block_ids: d.block_ids(),
                })
                .collect(),
        }
    }

    pub fn day_ids(&self) -> Vec<Uuid> {
        self.days.iter().map(|d| d.day_id).collect()
    }

    pub fn day_index(&self, day_id: Uuid) -> Option<usize> {
        self.days.iter().position(|d| d.day_id == day_id)
    }

    pub fn day(&self, day_id: Uuid) -> Option<&DayLayout> {
        self.days.iter().find(|d| d.day_id == day_id)
    }

    /// (day index, block index) of a block
    pub fn locate_block(&self, block_id: Uuid) -> Option<(usize, usize)> {
        self.days.iter().enumerate().find_map(|(day_idx, day)| {
            day.block_ids
                .iter()
                .position(|id| *id == block_id)
                .map(|block_idx| (day_idx, block_idx))
        })
    }

    /// Apply an operation whose result is fully known locally.
    ///
    /// Copies need the ids allocated by the store, so they are applied with
    /// [`ItineraryDraft::insert_blocks`] once the store answers. Returns
    /// whether the draft changed.
    pub fn apply(&mut self, operation: &MoveOperation) -> bool {
        match operation {
            MoveOperation::ReorderBlocks {
                day_id,
                ordered_ids,
            } => match self.days.iter_mut().find(|d| d.day_id == *day_id) {
                Some(day) => {
                    day.block_ids = ordered_ids.clone();
                    true
                }
                None => false,
            },
            MoveOperation::MoveBlock {
                block_id,
                target_day_id,
                position,
            } => {
                let Some(target_idx) = self.day_index(*target_day_id) else {
                    return false;
                };
                let Some((day_idx, block_idx)) = self.locate_block(*block_id) else {
                    return false;
                };
                let moved = self.days[day_idx].block_ids.remove(block_idx);
                let target = &mut self.days[target_idx].block_ids;
                let at = (*position).min(target.len());
                target.insert(at, moved);
                true
            }
            MoveOperation::ReorderDays { ordered_ids } => {
                let mut reordered = Vec::with_capacity(self.days.len());
                for day_id in ordered_ids {
                    match self.day(*day_id) {
                        Some(day) => reordered.push(day.clone()),
                        None => return false,
                    }
                }
                if reordered.len() != self.days.len() {
                    return false;
                }
                self.days = reordered;
                true
            }
            MoveOperation::DuplicateBlock { .. } | MoveOperation::CopyDayBlocks { .. } => false,
        }
    }

    /// Insert store-allocated block ids into a day
    pub fn insert_blocks(&mut self, day_id: Uuid, position: Option<usize>, ids: &[Uuid]) {
        if let Some(day) = self.days.iter_mut().find(|d| d.day_id == day_id) {
            let at = position
                .unwrap_or(day.block_ids.len())
                .min(day.block_ids.len());
            day.block_ids.splice(at..at, ids.iter().copied());
        }
    }

    /// Day order after moving one day onto another
    pub fn moved_day_ids(&self, from: usize, to: usize) -> Vec<Uuid> {
        array_move(&self.day_ids(), from, to)
    }
}
