//! Pricing conditions and variant-group resolution.
//!
//! A condition is a tenant-level choice axis ("Comfort tier") with options.
//! A trip activates some of them with one selected option each. Blocks of
//! one day that point at the same condition form a variant group; only the
//! block carrying the selected option is priced. The same condition usually
//! spans several days (one group per night of accommodation).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use super::formula::Formula;

/// Option of a condition
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConditionOption {
    pub id: Uuid,
    pub condition_id: Uuid,
    pub label: String,
    pub position: i32,
}

/// Condition activated on a trip, with its selected option
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TripCondition {
    pub trip_id: Uuid,
    pub condition_id: Uuid,
    pub selected_option_id: Option<Uuid>,
}

/// Selected option per activated condition
#[derive(Debug, Clone, Default)]
pub struct ConditionSelection {
    selected: HashMap<Uuid, Option<Uuid>>,
}

impl ConditionSelection {
    pub fn from_trip_conditions(conditions: &[TripCondition]) -> Self {
        Self {
            selected: conditions
                .iter()
                .map(|c| (c.condition_id, c.selected_option_id))
                .collect(),
        }
    }

    pub fn select(mut self, condition_id: Uuid, option_id: Uuid) -> Self {
        self.selected.insert(condition_id, Some(option_id));
        self
    }

    fn get(&self, condition_id: &Uuid) -> Option<Option<Uuid>> {
        self.selected.get(condition_id).copied()
    }
}

/// Ids of the blocks that should be priced, in input order.
///
/// - blocks without a condition are always active
/// - a group whose condition is not activated on the trip stays fully active
/// - otherwise the first block of the day carrying the selected option wins;
///   a group with no such block contributes nothing
pub fn active_formula_ids<'a, I>(formulas: I, selection: &ConditionSelection) -> Vec<Uuid>
where
    I: IntoIterator<Item = &'a Formula>,
{
    let mut resolved: HashSet<(Uuid, Uuid)> = HashSet::new();
    let mut active = Vec::new();

    for formula in formulas {
        let Some(condition_id) = formula.condition_id else {
            active.push(formula.id);
            continue;
        };

        match selection.get(&condition_id) {
            None => active.push(formula.id),
            Some(selected) => {
                if selected.is_some()
                    && formula.condition_option_id == selected
                    && resolved.insert((formula.day_id, condition_id))
                {
                    active.push(formula.id);
                }
            }
        }
    }

    active
}

/// Consistency report for one variant group
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VariantGroupReport {
    pub day_id: Uuid,
    pub condition_id: Uuid,
    pub selected_option_id: Option<Uuid>,
    pub active_formula_id: Option<Uuid>,
    /// Blocks of the group with no option assigned
    pub unassigned: Vec<Uuid>,
    /// Options claimed by more than one block
    pub duplicate_options: Vec<Uuid>,
    /// Options of the condition that no block carries
    pub missing_options: Vec<Uuid>,
}

impl VariantGroupReport {
    pub fn is_consistent(&self) -> bool {
        self.active_formula_id.is_some()
            && self.unassigned.is_empty()
            && self.duplicate_options.is_empty()
    }
}

/// Build one report per (day, condition) pair referenced by the given blocks,
/// in day order of first appearance.
pub fn variant_group_reports(
    formulas: &[&Formula],
    options: &[ConditionOption],
    selection: &ConditionSelection,
) -> Vec<VariantGroupReport> {
    let mut day_order: Vec<Uuid> = Vec::new();
    let mut groups: BTreeMap<(usize, Uuid), Vec<&Formula>> = BTreeMap::new();
    for formula in formulas {
        if let Some(condition_id) = formula.condition_id {
            let day_idx = match day_order.iter().position(|d| *d == formula.day_id) {
                Some(idx) => idx,
                None => {
                    day_order.push(formula.day_id);
                    day_order.len() - 1
                }
            };
            groups.entry((day_idx, condition_id)).or_default().push(formula);
        }
    }

    let active: HashSet<Uuid> = active_formula_ids(formulas.iter().copied(), selection)
        .into_iter()
        .collect();

    groups
        .into_iter()
        .map(|((day_idx, condition_id), members)| {
            let mut seen: HashMap<Uuid, usize> = HashMap::new();
            let mut unassigned = Vec::new();
            for formula in &members {
                match formula.condition_option_id {
                    Some(option_id) => *seen.entry(option_id).or_default() += 1,
                    None => unassigned.push(formula.id),
                }
            }

            let mut duplicate_options: Vec<Uuid> = seen
                .iter()
                .filter(|(_, count)| **count > 1)
                .map(|(id, _)| *id)
                .collect();
            duplicate_options.sort();

            let missing_options = options
                .iter()
                .filter(|o| o.condition_id == condition_id && !seen.contains_key(&o.id))
                .map(|o| o.id)
                .collect();

            // Only meaningful when the condition is activated on the trip
            let active_formula_id = match selection.get(&condition_id) {
                Some(_) => members.iter().find(|f| active.contains(&f.id)).map(|f| f.id),
                None => None,
            };

            VariantGroupReport {
                day_id: day_order[day_idx],
                condition_id,
                selected_option_id: selection.get(&condition_id).flatten(),
                active_formula_id,
                unassigned,
                duplicate_options,
                missing_options,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::formula::BlockKind;

    fn block(condition: Option<Uuid>, option: Option<Uuid>) -> Formula {
        block_on(Uuid::nil(), condition, option)
    }

    fn block_on(day_id: Uuid, condition: Option<Uuid>, option: Option<Uuid>) -> Formula {
        Formula {
            id: Uuid::new_v4(),
            day_id,
            kind: BlockKind::Accommodation,
            name: "Hotel".to_string(),
            description: String::new(),
            condition_id: condition,
            condition_option_id: option,
            items: vec![],
        }
    }

    fn option(condition_id: Uuid) -> ConditionOption {
        ConditionOption {
            id: Uuid::new_v4(),
            condition_id,
            label: "tier".to_string(),
            position: 0,
        }
    }

    #[test]
    fn test_unconditioned_blocks_always_active() {
        let a = block(None, None);
        let b = block(None, None);
        let ids = active_formula_ids([&a, &b], &ConditionSelection::default());
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn test_selected_option_picks_single_block() {
        let comfort = Uuid::new_v4();
        let (standard, superior) = (option(comfort), option(comfort));
        let a = block(Some(comfort), Some(standard.id));
        let b = block(Some(comfort), Some(superior.id));

        let selection = ConditionSelection::default().select(comfort, superior.id);
        assert_eq!(active_formula_ids([&a, &b], &selection), vec![b.id]);
    }

    #[test]
    fn test_inactive_condition_keeps_group() {
        let comfort = Uuid::new_v4();
        let a = block(Some(comfort), Some(Uuid::new_v4()));
        let b = block(Some(comfort), None);
        let ids = active_formula_ids([&a, &b], &ConditionSelection::default());
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn test_duplicate_assignment_only_first_active() {
        let comfort = Uuid::new_v4();
        let standard = option(comfort);
        let a = block(Some(comfort), Some(standard.id));
        let b = block(Some(comfort), Some(standard.id));

        let selection = ConditionSelection::default().select(comfort, standard.id);
        assert_eq!(active_formula_ids([&a, &b], &selection), vec![a.id]);
    }

    #[test]
    fn test_report_flags_gaps_and_duplicates() {
        let comfort = Uuid::new_v4();
        let (standard, superior, luxury) = (option(comfort), option(comfort), option(comfort));
        let a = block(Some(comfort), Some(standard.id));
        let b = block(Some(comfort), Some(standard.id));
        let c = block(Some(comfort), None);
        let plain = block(None, None);

        let selection = ConditionSelection::default().select(comfort, standard.id);
        let reports = variant_group_reports(
            &[&a, &b, &c, &plain],
            &[standard.clone(), superior.clone(), luxury.clone()],
            &selection,
        );

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.active_formula_id, Some(a.id));
        assert_eq!(report.unassigned, vec![c.id]);
        assert_eq!(report.duplicate_options, vec![standard.id]);
        assert_eq!(report.missing_options, vec![superior.id, luxury.id]);
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_report_consistent_group() {
        let comfort = Uuid::new_v4();
        let (standard, superior) = (option(comfort), option(comfort));
        let a = block(Some(comfort), Some(standard.id));
        let b = block(Some(comfort), Some(superior.id));

        let selection = ConditionSelection::default().select(comfort, superior.id);
        let reports = variant_group_reports(&[&a, &b], &[standard, superior], &selection);

        assert_eq!(reports[0].active_formula_id, Some(b.id));
        assert!(reports[0].is_consistent());
    }

    #[test]
    fn test_shared_condition_resolves_per_day() {
        let comfort = Uuid::new_v4();
        let (standard, superior) = (option(comfort), option(comfort));
        let (day1, day2) = (Uuid::new_v4(), Uuid::new_v4());
        let d1_standard = block_on(day1, Some(comfort), Some(standard.id));
        let d1_superior = block_on(day1, Some(comfort), Some(superior.id));
        let d2_standard = block_on(day2, Some(comfort), Some(standard.id));
        let d2_superior = block_on(day2, Some(comfort), Some(superior.id));

        let selection = ConditionSelection::default().select(comfort, superior.id);
        let blocks = [&d1_standard, &d1_superior, &d2_standard, &d2_superior];
        assert_eq!(
            active_formula_ids(blocks, &selection),
            vec![d1_superior.id, d2_superior.id]
        );

        let reports = variant_group_reports(&blocks, &[standard, superior], &selection);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].day_id, day1);
        assert_eq!(reports[0].active_formula_id, Some(d1_superior.id));
        assert_eq!(reports[1].day_id, day2);
        assert_eq!(reports[1].active_formula_id, Some(d2_superior.id));
        assert!(reports.iter().all(|r| r.duplicate_options.is_empty()));
        assert!(reports.iter().all(VariantGroupReport::is_consistent));
    }
}
