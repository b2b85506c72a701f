use crate::error::StoreError;
use crate::store::RecordStore;
use crate::types::{CanonicalRecord, Collection, RecordId};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// In-process store with the same replace-by-key semantics as the REST store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<Collection, BTreeMap<RecordId, Map<String, Value>>>,
    upsert_calls: usize,
    reject_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// A store whose every `upsert` fails, for exercising write-failure paths
    pub fn rejecting_writes() -> Self {
        MemoryStore {
            reject_writes: true,
            ..MemoryStore::default()
        }
    }

    /// Seed a collection with raw rows; rows without a string `id` are ignored
    pub fn with_rows(mut self, collection: Collection, rows: Vec<Map<String, Value>>) -> Self {
        let table = self.tables.entry(collection).or_default();
        for row in rows {
            if let Some(id) = row.get("id").and_then(Value::as_str) {
                table.insert(RecordId::new(id), row);
            }
        }
        self
    }

    pub fn get(&self, collection: Collection, id: &str) -> Option<&Map<String, Value>> {
        self.tables.get(&collection)?.get(&RecordId::new(id))
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.tables.get(&collection).map_or(0, BTreeMap::len)
    }

    /// Number of `upsert` calls made, including rejected ones
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls
    }
}

impl RecordStore for MemoryStore {
    fn upsert(
        &mut self,
        collection: Collection,
        records: &[CanonicalRecord],
    ) -> Result<(), StoreError> {
        self.upsert_calls += 1;
        if self.reject_writes {
            return Err(StoreError::Unavailable {
                collection,
                reason: "writes rejected".to_string(),
            });
        }

        let table = self.tables.entry(collection).or_default();
        for record in records {
            table.insert(record.id.clone(), record.data.clone());
        }
        Ok(())
    }

    fn fetch_all(&self, collection: Collection) -> Result<Vec<Map<String, Value>>, StoreError> {
        Ok(self
            .tables
            .get(&collection)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }
}
