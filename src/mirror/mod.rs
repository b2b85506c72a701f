//! Mirroring stored collections back to consumption-format JSON files

pub mod writer;

pub use writer::AtomicJsonWriter;

use crate::store::RecordStore;
use crate::transform::reverse_impact;
use crate::types::Collection;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

pub const RESEARCH_FILE: &str = "research.json";
pub const IMPACTS_FILE: &str = "reformImpacts.json";
pub const VALIDATION_FILE: &str = "validationMetadata.json";

/// Rows mirrored per collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub research: usize,
    pub impacts: usize,
    pub validation: usize,
    /// Stored rows left out for lacking an id
    pub skipped: usize,
}

impl fmt::Display for MirrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Research items: {}", self.research)?;
        writeln!(f, "Reform impacts: {}", self.impacts)?;
        write!(f, "Validation records: {}", self.validation)?;
        if self.skipped > 0 {
            write!(f, "\nSkipped rows without id: {}", self.skipped)?;
        }
        Ok(())
    }
}

pub struct Mirror<'s> {
    store: &'s dyn RecordStore,
    writer: AtomicJsonWriter,
}

impl<'s> Mirror<'s> {
    pub fn new<P: AsRef<Path>>(store: &'s dyn RecordStore, output_dir: P) -> Result<Self> {
        Ok(Mirror {
            store,
            writer: AtomicJsonWriter::new(output_dir)?,
        })
    }

    /// Fetch every collection and rewrite its output file
    pub fn run(&self) -> Result<MirrorReport> {
        let mut skipped = 0;
        let research = self.sync_research()?;
        let impacts = self.sync_impacts(&mut skipped)?;
        let validation = self.sync_validation(&mut skipped)?;

        Ok(MirrorReport {
            research,
            impacts,
            validation,
            skipped,
        })
    }

    fn fetch(&self, collection: Collection) -> Result<Vec<Map<String, Value>>> {
        let rows = self
            .store
            .fetch_all(collection)
            .with_context(|| format!("Failed to fetch {}", collection))?;
        info!(%collection, count = rows.len(), "fetched rows");
        Ok(rows)
    }

    /// Research rows are written as stored
    fn sync_research(&self) -> Result<usize> {
        let rows = self.fetch(Collection::Research)?;
        let path = self.writer.write(RESEARCH_FILE, &rows)?;
        info!(path = %path.display(), "wrote research");
        Ok(rows.len())
    }

    fn sync_impacts(&self, skipped: &mut usize) -> Result<usize> {
        let mut impacts = Map::new();
        for row in self.fetch(Collection::ReformImpacts)? {
            match reverse_impact(&row) {
                Ok((id, body)) => {
                    impacts.insert(id.0, Value::Object(body));
                }
                Err(e) => {
                    warn!(collection = %Collection::ReformImpacts, reason = %e.reason, "skipping stored row");
                    *skipped += 1;
                }
            }
        }

        let path = self.writer.write(IMPACTS_FILE, &impacts)?;
        info!(path = %path.display(), "wrote reform impacts");
        Ok(impacts.len())
    }

    /// Keyed by id with the remaining columns as stored; no file when the collection is empty
    fn sync_validation(&self, skipped: &mut usize) -> Result<usize> {
        let rows = self.fetch(Collection::ValidationMetadata)?;
        if rows.is_empty() {
            info!("no validation metadata; leaving file untouched");
            return Ok(0);
        }

        let mut metadata = Map::new();
        for mut row in rows {
            match row.remove("id") {
                Some(Value::String(id)) if !id.is_empty() => {
                    metadata.insert(id, Value::Object(row));
                }
                _ => {
                    warn!(collection = %Collection::ValidationMetadata, "skipping stored row without id");
                    *skipped += 1;
                }
            }
        }

        let path = self.writer.write(VALIDATION_FILE, &metadata)?;
        info!(path = %path.display(), "wrote validation metadata");
        Ok(metadata.len())
    }
}
