use crate::boxes::{is_inventory_id, next_chkara_id, BoxId, BoxKind, BoxRecord};
use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Inclusive range of inventory box ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkAssignment {
    pub farmer_id: i64,
    #[serde(default)]
    pub box_ids: Vec<u32>,
    #[serde(default)]
    pub ranges: Vec<BoxRange>,
    /// Number of new chkara sacks to create for the farmer
    #[serde(default)]
    pub chkara_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentLimits {
    pub box_count: u32,
    pub max_bulk_boxes: usize,
}

impl Default for AssignmentLimits {
    fn default() -> Self {
        Self {
            box_count: 600,
            max_bulk_boxes: 600,
        }
    }
}

/// Outcome of planning: existing boxes to flip to IN_USE and the sack ids to
/// create. Applying it is the store's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentPlan {
    pub farmer_id: i64,
    pub existing: Vec<BoxId>,
    pub new_chkara: Vec<BoxId>,
}

impl AssignmentPlan {
    pub fn total(&self) -> usize {
        self.existing.len() + self.new_chkara.len()
    }

    pub fn all_ids(&self) -> Vec<BoxId> {
        let mut ids: Vec<BoxId> = self
            .existing
            .iter()
            .chain(self.new_chkara.iter())
            .copied()
            .collect();
        ids.sort();
        ids
    }
}

/// Validate a bulk assignment against the current boxes and decide which ids
/// it touches. Every unavailable box is reported at once.
pub fn plan_bulk_assignment(
    request: &BulkAssignment,
    limits: AssignmentLimits,
    boxes: &BTreeMap<u32, BoxRecord>,
) -> Result<AssignmentPlan> {
    let mut requested = Vec::new();
    let mut seen = HashSet::new();

    for range in &request.ranges {
        if range.start == 0 || range.start > range.end || range.end > limits.box_count {
            return Err(DomainError::InvalidRange {
                start: range.start,
                end: range.end,
                max: limits.box_count,
            });
        }
    }

    let explicit = request.box_ids.iter().copied();
    let expanded = request.ranges.iter().flat_map(|r| r.start..=r.end);
    for id in explicit.chain(expanded) {
        if !seen.insert(id) {
            return Err(DomainError::DuplicateBox(id));
        }
        requested.push(id);
        let total = requested.len() + request.chkara_count as usize;
        if total > limits.max_bulk_boxes {
            return Err(DomainError::TooManyBoxes {
                requested: request.box_ids.len()
                    + request
                        .ranges
                        .iter()
                        .map(|r| (r.end - r.start + 1) as usize)
                        .sum::<usize>()
                    + request.chkara_count as usize,
                max: limits.max_bulk_boxes,
            });
        }
    }

    let chkara_count = request.chkara_count as usize;
    if requested.is_empty() && chkara_count == 0 {
        return Err(DomainError::EmptyAssignment);
    }
    if chkara_count > limits.max_bulk_boxes {
        return Err(DomainError::TooManyBoxes {
            requested: chkara_count,
            max: limits.max_bulk_boxes,
        });
    }

    let mut unavailable = Vec::new();
    for &id in &requested {
        let Some(record) = boxes.get(&id) else {
            return Err(DomainError::UnknownBox(id));
        };
        if !is_inventory_id(id, limits.box_count) && record.kind != BoxKind::Chkara {
            return Err(DomainError::UnknownBox(id));
        }
        if !record.is_available() {
            unavailable.push(id);
        }
    }
    if !unavailable.is_empty() {
        unavailable.sort_unstable();
        return Err(DomainError::BoxesNotAvailable { ids: unavailable });
    }

    let mut taken: BTreeSet<u32> = boxes.keys().copied().collect();
    let mut new_chkara = Vec::with_capacity(chkara_count);
    for _ in 0..chkara_count {
        let id = next_chkara_id(&taken, limits.box_count);
        taken.insert(id.0);
        new_chkara.push(id);
    }

    Ok(AssignmentPlan {
        farmer_id: request.farmer_id,
        existing: requested.into_iter().map(BoxId).collect(),
        new_chkara,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inventory(count: u32) -> BTreeMap<u32, BoxRecord> {
        (1..=count).map(|id| (id, BoxRecord::inventory(id))).collect()
    }

    fn limits() -> AssignmentLimits {
        AssignmentLimits {
            box_count: 20,
            max_bulk_boxes: 10,
        }
    }

    #[test]
    fn plans_explicit_ids_ranges_and_sacks() {
        let mut boxes = inventory(20);
        boxes.insert(21, BoxRecord::chkara(21));
        boxes.insert(23, BoxRecord::chkara(23));

        let request = BulkAssignment {
            farmer_id: 7,
            box_ids: vec![2, 21],
            ranges: vec![BoxRange { start: 5, end: 7 }],
            chkara_count: 2,
        };
        let plan = plan_bulk_assignment(&request, limits(), &boxes).unwrap();
        assert_eq!(
            plan.existing,
            vec![BoxId(2), BoxId(21), BoxId(5), BoxId(6), BoxId(7)]
        );
        assert_eq!(plan.new_chkara, vec![BoxId(22), BoxId(24)]);
        assert_eq!(plan.total(), 7);
    }

    #[test]
    fn reports_every_unavailable_box() {
        let mut boxes = inventory(20);
        boxes.get_mut(&3).unwrap().assign(1).unwrap();
        boxes.get_mut(&9).unwrap().assign(2).unwrap();

        let request = BulkAssignment {
            farmer_id: 7,
            ranges: vec![BoxRange { start: 1, end: 10 }],
            ..Default::default()
        };
        let err = plan_bulk_assignment(&request, limits(), &boxes).unwrap_err();
        assert_eq!(err, DomainError::BoxesNotAvailable { ids: vec![3, 9] });
    }

    #[test]
    fn rejects_bad_ranges_and_duplicates() {
        let boxes = inventory(20);
        let backwards = BulkAssignment {
            farmer_id: 1,
            ranges: vec![BoxRange { start: 8, end: 4 }],
            ..Default::default()
        };
        assert!(matches!(
            plan_bulk_assignment(&backwards, limits(), &boxes),
            Err(DomainError::InvalidRange { start: 8, end: 4, .. })
        ));

        let beyond = BulkAssignment {
            farmer_id: 1,
            ranges: vec![BoxRange { start: 18, end: 25 }],
            ..Default::default()
        };
        assert!(matches!(
            plan_bulk_assignment(&beyond, limits(), &boxes),
            Err(DomainError::InvalidRange { .. })
        ));

        let duplicate = BulkAssignment {
            farmer_id: 1,
            box_ids: vec![4],
            ranges: vec![BoxRange { start: 3, end: 5 }],
            ..Default::default()
        };
        assert_eq!(
            plan_bulk_assignment(&duplicate, limits(), &boxes),
            Err(DomainError::DuplicateBox(4))
        );
    }

    #[test]
    fn rejects_unknown_and_empty_and_oversized() {
        let boxes = inventory(20);
        let unknown = BulkAssignment {
            farmer_id: 1,
            box_ids: vec![99],
            ..Default::default()
        };
        assert_eq!(
            plan_bulk_assignment(&unknown, limits(), &boxes),
            Err(DomainError::UnknownBox(99))
        );

        let empty = BulkAssignment {
            farmer_id: 1,
            ..Default::default()
        };
        assert_eq!(
            plan_bulk_assignment(&empty, limits(), &boxes),
            Err(DomainError::EmptyAssignment)
        );

        let oversized = BulkAssignment {
            farmer_id: 1,
            ranges: vec![BoxRange { start: 1, end: 8 }],
            chkara_count: 3,
            ..Default::default()
        };
        assert!(matches!(
            plan_bulk_assignment(&oversized, limits(), &boxes),
            Err(DomainError::TooManyBoxes { requested: 11, max: 10 })
        ));
    }
}
