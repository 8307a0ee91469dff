//! Row mutation tracking for one result set
//!
//! Row positions are 1-based ordinals. Deleting a row marks it in place and
//! never renumbers. Inserting a row at position `p` shifts every tracked
//! position `>= p` up by one before `p` is marked inserted, so marks keep
//! following the rows they were made on.

use std::collections::BTreeSet;

/// Updated, deleted and inserted row positions of a result set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMutations {
    updated: BTreeSet<usize>,
    deleted: BTreeSet<usize>,
    inserted: BTreeSet<usize>,
}

impl RowMutations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_updated(&mut self, row: usize) {
        self.updated.insert(row);
    }

    pub fn mark_deleted(&mut self, row: usize) {
        self.deleted.insert(row);
    }

    /// Record a row inserted at `row`, shifting later marks down by one
    pub fn mark_inserted(&mut self, row: usize) {
        for set in [&mut self.updated, &mut self.deleted, &mut self.inserted] {
            *set = set
                .iter()
                .map(|&r| if r >= row { r + 1 } else { r })
                .collect();
        }
        self.inserted.insert(row);
    }

    pub fn is_updated(&self, row: usize) -> bool {
        self.updated.contains(&row)
    }

    pub fn is_deleted(&self, row: usize) -> bool {
        self.deleted.contains(&row)
    }

    pub fn is_inserted(&self, row: usize) -> bool {
        self.inserted.contains(&row)
    }

    pub fn updated_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.updated.iter().copied()
    }

    pub fn deleted_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.deleted.iter().copied()
    }

    pub fn inserted_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.inserted.iter().copied()
    }
}
