//! Referential integrity between child records and the collection they reference.
//!
//! The store does not enforce the `reform_impacts.id -> research.id` link, so
//! it is checked here before anything is written.

use crate::types::{CanonicalRecord, RecordId};
use std::collections::BTreeSet;

/// A batch split by whether each record's parent exists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Records whose parent key is present, in batch order
    pub valid: Vec<CanonicalRecord>,
    /// Ids of records whose parent key is absent, in batch order
    pub orphans: Vec<RecordId>,
}

impl Reconciliation {
    pub fn has_orphans(&self) -> bool {
        !self.orphans.is_empty()
    }
}

/// Partition `batch` against the set of existing parent keys.
///
/// Pure: the batch is not modified and nothing outside the arguments is read.
pub fn reconcile(existing: &BTreeSet<RecordId>, batch: &[CanonicalRecord]) -> Reconciliation {
    let mut reconciliation = Reconciliation::default();
    for record in batch {
        if existing.contains(record.parent_key()) {
            reconciliation.valid.push(record.clone());
        } else {
            reconciliation.orphans.push(record.id.clone());
        }
    }
    reconciliation
}
