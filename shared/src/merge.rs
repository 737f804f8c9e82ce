//! Duplicate merge planning for the vehicle-type catalog
//!
//! Rows are grouped by the canonical label their current label normalizes to.
//! The first row of each group (input order) survives and is relabeled when
//! needed; every other row of the group is a duplicate to delete.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::ProductRow;
use crate::normalize::{MatchKind, VehicleTypeNormalizer};
use crate::types::RowId;

/// A catalog row scheduled for deletion
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Duplicate {
    pub id: RowId,
    pub label: String,
}

/// All catalog rows sharing one canonical label
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergeGroup {
    pub canonical: String,
    pub kind: MatchKind,
    pub survivor: RowId,
    pub survivor_label: String,
    /// Survivor's trimmed label differs from `canonical`; its own code is
    /// kept otherwise
    pub rename: bool,
    pub duplicates: Vec<Duplicate>,
}

impl MergeGroup {
    pub fn is_noop(&self) -> bool {
        !self.rename && self.duplicates.is_empty()
    }
}

/// Result of [`plan_merge`]
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MergePlan {
    pub groups: Vec<MergeGroup>,
    /// Rows with neither a code nor a name
    pub unlabeled: Vec<RowId>,
}

impl MergePlan {
    pub fn renames(&self) -> impl Iterator<Item = &MergeGroup> {
        self.groups.iter().filter(|g| g.rename)
    }

    pub fn rename_count(&self) -> usize {
        self.renames().count()
    }

    pub fn deletion_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates.len()).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.groups.iter().all(MergeGroup::is_noop)
    }

    /// Labels that matched no alias or rule, in first-seen order
    pub fn unmatched_labels(&self) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|g| g.kind == MatchKind::Unmatched)
            .map(|g| g.canonical.as_str())
            .collect()
    }
}

/// Group catalog rows by canonical label and pick one survivor per group
pub fn plan_merge(normalizer: &VehicleTypeNormalizer, rows: &[ProductRow]) -> MergePlan {
    let mut plan = MergePlan::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(label) = row.label() else {
            plan.unlabeled.push(row.id.clone());
            continue;
        };
        let normalized = normalizer.classify(label);

        match index.get(&normalized.label) {
            Some(&position) => plan.groups[position].duplicates.push(Duplicate {
                id: row.id.clone(),
                label: label.to_string(),
            }),
            None => {
                index.insert(normalized.label.clone(), plan.groups.len());
                plan.groups.push(MergeGroup {
                    rename: label != normalized.label,
                    canonical: normalized.label,
                    kind: normalized.kind,
                    survivor: row.id.clone(),
                    survivor_label: label.to_string(),
                    duplicates: Vec::new(),
                });
            }
        }
    }

    plan
}
