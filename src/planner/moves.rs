//! Drag-and-drop reconciliation.
//!
//! Maps a finished drag (what was dragged, what it was dropped on) to the
//! single itinerary mutation it stands for. Pure: the caller dispatches.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::draft::ItineraryDraft;

/// What is being dragged.
///
/// Block payloads may arrive with the `day_id` the editor rendered them in;
/// it is ignored and the block's day is looked up in the [`ItineraryDraft`],
/// which always reflects the server's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DragPayload {
    /// A block of the edited circuit
    Block { block_id: Uuid },
    /// A day of the edited circuit
    CircuitDay { day_id: Uuid },
    /// A block from the read-only source panel (template or other circuit)
    SourceBlock { block_id: Uuid },
    /// A whole day from the read-only source panel
    SourceDay { day_id: Uuid },
}

/// What it was dropped on. As for [`DragPayload`], a `day_id` sent along
/// with a block target is ignored in favour of the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropTarget {
    Block { block_id: Uuid },
    Day { day_id: Uuid },
}

/// Itinerary mutation resulting from a drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoveOperation {
    ReorderBlocks {
        day_id: Uuid,
        ordered_ids: Vec<Uuid>,
    },
    MoveBlock {
        block_id: Uuid,
        target_day_id: Uuid,
        position: usize,
    },
    ReorderDays {
        ordered_ids: Vec<Uuid>,
    },
    DuplicateBlock {
        source_block_id: Uuid,
        target_day_id: Uuid,
        position: Option<usize>,
    },
    CopyDayBlocks {
        source_day_id: Uuid,
        target_day_id: Uuid,
    },
}

impl MoveOperation {
    pub fn name(&self) -> &'static str {
        match self {
            MoveOperation::ReorderBlocks { .. } => "reorder_blocks",
            MoveOperation::MoveBlock { .. } => "move_block",
            MoveOperation::ReorderDays { .. } => "reorder_days",
            MoveOperation::DuplicateBlock { .. } => "duplicate_block",
            MoveOperation::CopyDayBlocks { .. } => "copy_day_blocks",
        }
    }
}

/// Move the element at `from` to index `to`, shifting the others.
///
/// Out-of-range indices leave the order unchanged.
pub fn array_move<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = items.to_vec();
    if from >= out.len() || to >= out.len() {
        return out;
    }
    let item = out.remove(from);
    out.insert(to, item);
    out
}

/// Resolve the drop target to (day index, optional block index)
fn resolve_target(draft: &ItineraryDraft, over: &DropTarget) -> Option<(usize, Option<usize>)> {
    match *over {
        DropTarget::Block { block_id } => draft
            .locate_block(block_id)
            .map(|(day_idx, block_idx)| (day_idx, Some(block_idx))),
        DropTarget::Day { day_id } => draft.day_index(day_id).map(|idx| (idx, None)),
    }
}

/// Decide which mutation a drop stands for.
///
/// Returns `None` for drops that change nothing (a block onto itself, a day
/// onto itself) and for ids the draft doesn't know.
pub fn reconcile(
    draft: &ItineraryDraft,
    active: &DragPayload,
    over: &DropTarget,
) -> Option<MoveOperation> {
    let (target_day_idx, target_block_idx) = resolve_target(draft, over)?;
    let target_day = &draft.days[target_day_idx];

    match *active {
        DragPayload::Block { block_id } => {
            let (source_day_idx, source_block_idx) = draft.locate_block(block_id)?;

            if source_day_idx == target_day_idx {
                // Same day: only a drop onto another block reorders
                let to = target_block_idx?;
                if to == source_block_idx {
                    return None;
                }
                Some(MoveOperation::ReorderBlocks {
                    day_id: target_day.day_id,
                    ordered_ids: array_move(&target_day.block_ids, source_block_idx, to),
                })
            } else {
                Some(MoveOperation::MoveBlock {
                    block_id,
                    target_day_id: target_day.day_id,
                    position: target_block_idx.unwrap_or(target_day.block_ids.len()),
                })
            }
        }
        DragPayload::CircuitDay { day_id } => {
            let from = draft.day_index(day_id)?;
            if from == target_day_idx {
                return None;
            }
            Some(MoveOperation::ReorderDays {
                ordered_ids: draft.moved_day_ids(from, target_day_idx),
            })
        }
        DragPayload::SourceBlock { block_id } => Some(MoveOperation::DuplicateBlock {
            source_block_id: block_id,
            target_day_id: target_day.day_id,
            position: target_block_idx,
        }),
        DragPayload::SourceDay { day_id } => Some(MoveOperation::CopyDayBlocks {
            source_day_id: day_id,
            target_day_id: target_day.day_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::draft::DayLayout;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn draft() -> ItineraryDraft {
        ItineraryDraft::new(
            Uuid::new_v4(),
            vec![
                DayLayout {
                    day_id: Uuid::new_v4(),
                    block_ids: ids(4),
                },
                DayLayout {
                    day_id: Uuid::new_v4(),
                    block_ids: ids(2),
                },
                DayLayout {
                    day_id: Uuid::new_v4(),
                    block_ids: vec![],
                },
            ],
        )
    }

    // ==================== array_move tests ====================

    #[test]
    fn test_array_move_forward_and_back() {
        assert_eq!(array_move(&[1, 2, 3, 4], 0, 2), vec![2, 3, 1, 4]);
        assert_eq!(array_move(&[1, 2, 3, 4], 3, 1), vec![1, 4, 2, 3]);
        assert_eq!(array_move(&[1, 2, 3], 1, 1), vec![1, 2, 3]);
    }

    #[test]
    fn test_array_move_out_of_range_is_identity() {
        assert_eq!(array_move(&[1, 2, 3], 5, 0), vec![1, 2, 3]);
        assert_eq!(array_move::<i32>(&[], 0, 0), Vec::<i32>::new());
    }

    // ==================== reconcile tests ====================

    #[test]
    fn test_block_onto_block_same_day_reorders() {
        let d = draft();
        let day = &d.days[0];
        for (from, to) in [(0, 3), (3, 0), (1, 2)] {
            let op = reconcile(
                &d,
                &DragPayload::Block {
                    block_id: day.block_ids[from],
                },
                &DropTarget::Block {
                    block_id: day.block_ids[to],
                },
            );
            assert_eq!(
                op,
                Some(MoveOperation::ReorderBlocks {
                    day_id: day.day_id,
                    ordered_ids: array_move(&day.block_ids, from, to),
                })
            );
        }
    }

    #[test]
    fn test_block_onto_itself_is_noop() {
        let d = draft();
        let block = d.days[0].block_ids[1];
        assert_eq!(
            reconcile(
                &d,
                &DragPayload::Block { block_id: block },
                &DropTarget::Block { block_id: block },
            ),
            None
        );
        assert_eq!(
            reconcile(
                &d,
                &DragPayload::Block { block_id: block },
                &DropTarget::Day {
                    day_id: d.days[0].day_id
                },
            ),
            None
        );
    }

    #[test]
    fn test_block_onto_other_day_moves() {
        let d = draft();
        let block = d.days[0].block_ids[2];

        let onto_day = reconcile(
            &d,
            &DragPayload::Block { block_id: block },
            &DropTarget::Day {
                day_id: d.days[1].day_id,
            },
        );
        assert_eq!(
            onto_day,
            Some(MoveOperation::MoveBlock {
                block_id: block,
                target_day_id: d.days[1].day_id,
                position: 2,
            })
        );

        let onto_block = reconcile(
            &d,
            &DragPayload::Block { block_id: block },
            &DropTarget::Block {
                block_id: d.days[1].block_ids[0],
            },
        );
        assert!(matches!(
            onto_block,
            Some(MoveOperation::MoveBlock { target_day_id, position: 0, .. })
                if target_day_id == d.days[1].day_id
        ));
    }

    #[test]
    fn test_block_onto_empty_day_moves_to_start() {
        let d = draft();
        let block = d.days[1].block_ids[0];
        assert_eq!(
            reconcile(
                &d,
                &DragPayload::Block { block_id: block },
                &DropTarget::Day {
                    day_id: d.days[2].day_id
                },
            ),
            Some(MoveOperation::MoveBlock {
                block_id: block,
                target_day_id: d.days[2].day_id,
                position: 0,
            })
        );
    }

    #[test]
    fn test_day_onto_day_reorders_days() {
        let d = draft();
        let op = reconcile(
            &d,
            &DragPayload::CircuitDay {
                day_id: d.days[2].day_id,
            },
            &DropTarget::Day {
                day_id: d.days[0].day_id,
            },
        );
        assert_eq!(
            op,
            Some(MoveOperation::ReorderDays {
                ordered_ids: vec![d.days[2].day_id, d.days[0].day_id, d.days[1].day_id],
            })
        );
    }

    #[test]
    fn test_day_onto_block_of_other_day_reorders_days() {
        let d = draft();
        let op = reconcile(
            &d,
            &DragPayload::CircuitDay {
                day_id: d.days[0].day_id,
            },
            &DropTarget::Block {
                block_id: d.days[1].block_ids[1],
            },
        );
        assert_eq!(
            op,
            Some(MoveOperation::ReorderDays {
                ordered_ids: vec![d.days[1].day_id, d.days[0].day_id, d.days[2].day_id],
            })
        );
    }

    #[test]
    fn test_day_onto_itself_is_noop() {
        let d = draft();
        let day_id = d.days[1].day_id;
        assert_eq!(
            reconcile(
                &d,
                &DragPayload::CircuitDay { day_id },
                &DropTarget::Day { day_id },
            ),
            None
        );
    }

    #[test]
    fn test_source_block_duplicates() {
        let d = draft();
        let template_block = Uuid::new_v4();
        assert_eq!(
            reconcile(
                &d,
                &DragPayload::SourceBlock {
                    block_id: template_block
                },
                &DropTarget::Block {
                    block_id: d.days[0].block_ids[1],
                },
            ),
            Some(MoveOperation::DuplicateBlock {
                source_block_id: template_block,
                target_day_id: d.days[0].day_id,
                position: Some(1),
            })
        );
    }

    #[test]
    fn test_source_day_copies_blocks() {
        let d = draft();
        let template_day = Uuid::new_v4();
        assert_eq!(
            reconcile(
                &d,
                &DragPayload::SourceDay {
                    day_id: template_day
                },
                &DropTarget::Day {
                    day_id: d.days[1].day_id,
                },
            ),
            Some(MoveOperation::CopyDayBlocks {
                source_day_id: template_day,
                target_day_id: d.days[1].day_id,
            })
        );
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let d = draft();
        assert_eq!(
            reconcile(
                &d,
                &DragPayload::Block {
                    block_id: Uuid::new_v4()
                },
                &DropTarget::Day {
                    day_id: d.days[0].day_id,
                },
            ),
            None
        );
        assert_eq!(
            reconcile(
                &d,
                &DragPayload::SourceDay {
                    day_id: Uuid::new_v4()
                },
                &DropTarget::Day {
                    day_id: Uuid::new_v4(),
                },
            ),
            None
        );
    }

    #[test]
    fn test_payload_deserializes_from_tagged_json() {
        let id = Uuid::new_v4();
        let payload: DragPayload =
            serde_json::from_str(&format!(r#"{{"type":"source_day","day_id":"{}"}}"#, id))
                .unwrap();
        assert_eq!(payload, DragPayload::SourceDay { day_id: id });
    }

    #[test]
    fn test_client_day_id_is_ignored() {
        let d = draft();
        let block = d.days[0].block_ids[0];
        let stale_day = Uuid::new_v4();

        let active: DragPayload = serde_json::from_value(serde_json::json!({
            "type": "block",
            "block_id": block,
            "day_id": stale_day,
        }))
        .unwrap();
        let over: DropTarget = serde_json::from_value(serde_json::json!({
            "type": "day",
            "day_id": d.days[1].day_id,
        }))
        .unwrap();

        assert_eq!(active, DragPayload::Block { block_id: block });
        assert!(matches!(
            reconcile(&d, &active, &over),
            Some(MoveOperation::MoveBlock { block_id, target_day_id, .. })
                if block_id == block && target_day_id == d.days[1].day_id
        ));
    }
}
