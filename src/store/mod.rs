//! Destination stores
//!
//! Collections are written only through [`RecordStore::upsert`], which
//! replaces whole rows by primary key. Reads are unrestricted.

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use crate::error::StoreError;
use crate::types::{CanonicalRecord, Collection, RecordId};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A keyed store of JSON rows, one table per [`Collection`]
pub trait RecordStore {
    /// Insert or replace every record by `id` in a single call.
    ///
    /// A replaced row takes exactly the fields of the new record; nothing
    /// from the old row survives.
    fn upsert(&mut self, collection: Collection, records: &[CanonicalRecord])
        -> Result<(), StoreError>;

    /// Every row of a collection, as stored
    fn fetch_all(&self, collection: Collection) -> Result<Vec<Map<String, Value>>, StoreError>;

    /// Primary keys present in a collection
    fn fetch_ids(&self, collection: Collection) -> Result<BTreeSet<RecordId>, StoreError> {
        Ok(self
            .fetch_all(collection)?
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str))
            .map(RecordId::new)
            .collect())
    }
}
