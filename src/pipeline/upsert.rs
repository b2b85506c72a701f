use crate::error::{RecordTransformError, StoreError};
use crate::pipeline::report::CollectionReport;
use crate::store::RecordStore;
use crate::types::{CanonicalRecord, Collection, RecordId};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};

/// Batched insert-or-replace by primary key, with a dry-run mode.
///
/// In dry-run mode the store, if any, is only read; `upsert` is never called.
pub struct UpsertPipeline<'s> {
    store: Option<&'s mut dyn RecordStore>,
    dry_run: bool,
}

impl<'s> UpsertPipeline<'s> {
    /// A live pipeline must have a store
    pub fn new(store: Option<&'s mut dyn RecordStore>, dry_run: bool) -> Result<Self, StoreError> {
        if !dry_run && store.is_none() {
            return Err(StoreError::NotConfigured);
        }
        Ok(UpsertPipeline { store, dry_run })
    }

    /// A dry-run pipeline, optionally reading parent keys from `store`
    pub fn dry_run(store: Option<&'s mut dyn RecordStore>) -> Self {
        UpsertPipeline {
            store,
            dry_run: true,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run a fallible per-record step over `items`, keeping what succeeds.
    ///
    /// A failure skips that record only; it is logged with the record id and
    /// kept in the report.
    pub fn stage<T, F>(
        &self,
        items: impl IntoIterator<Item = T>,
        report: &mut CollectionReport,
        mut step: F,
    ) -> Vec<CanonicalRecord>
    where
        F: FnMut(T) -> Result<CanonicalRecord, RecordTransformError>,
    {
        let mut staged = Vec::new();
        for item in items {
            report.loaded += 1;
            match step(item) {
                Ok(record) => {
                    report.transformed += 1;
                    staged.push(record);
                }
                Err(e) => {
                    warn!(collection = %report.collection, id = %e.id, reason = %e.reason, "skipping record");
                    report.skipped += 1;
                    report.failures.push(e);
                }
            }
        }
        staged
    }

    /// Primary keys already in the store; empty when there is no store
    pub fn existing_ids(&self, collection: Collection) -> Result<BTreeSet<RecordId>, StoreError> {
        match self.store.as_deref() {
            Some(store) => store.fetch_ids(collection),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Write `records` to `collection` as one batch.
    ///
    /// Returns the ids that were written, or would have been in a dry run.
    /// On a store failure nothing from the batch counts as written.
    pub fn write(
        &mut self,
        collection: Collection,
        records: Vec<CanonicalRecord>,
        report: &mut CollectionReport,
    ) -> Result<Vec<RecordId>, StoreError> {
        report.dry_run = self.dry_run;
        let batch = dedupe_by_id(records, report);
        let ids: Vec<RecordId> = batch.iter().map(|r| r.id.clone()).collect();

        if self.dry_run {
            for record in &batch {
                info!("[DRY RUN] {}", describe(record));
            }
            report.planned += batch.len();
            return Ok(ids);
        }

        if batch.is_empty() {
            return Ok(ids);
        }

        let store = self.store.as_deref_mut().ok_or(StoreError::NotConfigured)?;
        match store.upsert(collection, &batch) {
            Ok(()) => {
                info!(%collection, count = batch.len(), "inserted/updated records");
                report.written += batch.len();
                Ok(ids)
            }
            Err(e) => {
                warn!(%collection, count = batch.len(), error = %e, "batch write failed");
                report.write_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

/// Keep the first record for each id; the store rejects a batch that touches a row twice
fn dedupe_by_id(records: Vec<CanonicalRecord>, report: &mut CollectionReport) -> Vec<CanonicalRecord> {
    let mut seen = HashSet::new();
    let mut batch = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.id.clone()) {
            batch.push(record);
        } else {
            warn!(collection = %report.collection, id = %record.id, "duplicate id in batch; keeping the first");
            report.skipped += 1;
        }
    }
    batch
}

/// One-line description of a record for dry-run output
pub fn describe(record: &CanonicalRecord) -> String {
    match record.collection {
        Collection::Research => {
            let icon = if record.text("status") == Some("published") {
                '✓'
            } else {
                '○'
            };
            let title: String = record
                .text("title")
                .unwrap_or("No title")
                .chars()
                .take(50)
                .collect();
            format!(
                "{icon} {} ({}) - {title}",
                record.id,
                record.text("state").unwrap_or("?")
            )
        }
        Collection::ReformImpacts => {
            let policy = match record.get("policy_id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => "none".to_string(),
            };
            let revenue = record
                .get("budgetary_impact")
                .and_then(|b| b.get("netCost"))
                .and_then(Value::as_f64)
                .filter(|cost| *cost != 0.0)
                .map(|cost| format!("${}M", with_thousands(cost / 1e6)))
                .unwrap_or_else(|| "N/A".to_string());
            format!("○ {} - policy_id: {policy} - revenue: {revenue}", record.id)
        }
        Collection::ValidationMetadata => record.id.to_string(),
    }
}

/// One decimal place with comma-grouped thousands: `-1234.56` -> `-1,234.6`
fn with_thousands(value: f64) -> String {
    let formatted = format!("{:.1}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "0"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}
