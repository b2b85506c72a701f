use crate::error::RecordTransformError;
use crate::types::{Collection, RecordId};
use std::fmt;

/// Counts and per-record outcomes for one collection in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub collection: Collection,
    /// Counts come from a dry run; `planned` replaces `written`
    pub dry_run: bool,
    /// Records that entered the pipeline
    pub loaded: usize,
    /// Records that made it through transformation
    pub transformed: usize,
    /// Records acknowledged by the store
    pub written: usize,
    /// Records a dry run would have written
    pub planned: usize,
    /// Records dropped by a transform failure or as in-batch duplicates
    pub skipped: usize,
    pub failures: Vec<RecordTransformError>,
    pub orphans: Vec<RecordId>,
    /// Set when the batch write failed; nothing from the batch counts as written
    pub write_error: Option<String>,
}

impl CollectionReport {
    pub fn new(collection: Collection) -> Self {
        CollectionReport {
            collection,
            dry_run: false,
            loaded: 0,
            transformed: 0,
            written: 0,
            planned: 0,
            skipped: 0,
            failures: Vec::new(),
            orphans: Vec::new(),
            write_error: None,
        }
    }

    pub fn orphaned(&self) -> usize {
        self.orphans.len()
    }
}

impl fmt::Display for CollectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: loaded {}, transformed {}, ",
            self.collection, self.loaded, self.transformed
        )?;
        if self.dry_run {
            write!(f, "would write {}, ", self.planned)?;
        } else {
            write!(f, "written {}, ", self.written)?;
        }
        write!(f, "skipped {}, orphaned {}", self.skipped, self.orphaned())?;
        if let Some(error) = &self.write_error {
            write!(f, " (write failed: {error})")?;
        }
        Ok(())
    }
}

/// Outcome of a whole migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub dry_run: bool,
    /// Source blocks without the identity fields of a research item
    pub ignored_blocks: usize,
    pub research: CollectionReport,
    pub impacts: CollectionReport,
}

impl MigrationReport {
    pub fn new(dry_run: bool) -> Self {
        let report = |collection| CollectionReport {
            dry_run,
            ..CollectionReport::new(collection)
        };
        MigrationReport {
            dry_run,
            ignored_blocks: 0,
            research: report(Collection::Research),
            impacts: report(Collection::ReformImpacts),
        }
    }

    /// True when no batch write failed
    pub fn is_complete(&self) -> bool {
        self.research.write_error.is_none() && self.impacts.write_error.is_none()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.research)?;
        writeln!(f, "{}", self.impacts)?;
        write!(f, "ignored source blocks: {}", self.ignored_blocks)?;
        if self.dry_run {
            write!(f, "\nThis was a dry run. No data was modified.")?;
        }
        Ok(())
    }
}
