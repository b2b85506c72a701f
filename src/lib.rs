//! # Tracker Sync - Research Catalog Migration
//!
//! Moves a research catalog out of a legacy object-literal source file into a
//! keyed store, and mirrors the store back to static JSON for consumers.
//!
//! ## Modules
//!
//! - **source**: Recover records from `export const research = [...]` text
//! - **transform**: Rename fields between consumption and storage naming
//! - **reconcile**: Split child records by whether their parent exists
//! - **pipeline**: Idempotent batched upserts with a dry-run mode
//! - **store**: The store trait plus REST and in-memory implementations
//! - **mirror**: Write stored collections back out as JSON files
//!
//! ## Quick Start
//!
//! ```rust
//! use tracker_sync::{migrate, MemoryStore, MigrationInput};
//! use serde_json::Map;
//!
//! # fn main() -> anyhow::Result<()> {
//! let source = r#"
//! export const research = [
//!   { id: "ut-flat-tax", state: "UT", type: "blog", title: "Utah flat tax" },
//! ];
//! "#;
//!
//! let mut store = MemoryStore::new();
//! let report = migrate(&MigrationInput::new(source, Map::new()), Some(&mut store), false)?;
//!
//! assert_eq!(report.research.written, 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod migrate;
pub mod mirror;
pub mod pipeline;
pub mod reconcile;
pub mod source;
pub mod store;
pub mod transform;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{StoreArgs, StoreConfig, SyncConfig};
pub use error::{FormatError, RecordTransformError, StoreError, SyncError};
pub use migrate::{run_migration, MigrationInput};
pub use mirror::{Mirror, MirrorReport};
pub use pipeline::{CollectionReport, MigrationReport, UpsertPipeline};
pub use reconcile::{reconcile, Reconciliation};
pub use source::extract_records;
pub use store::{MemoryStore, RecordStore, RestStore};
pub use types::{CanonicalRecord, Collection, RecordId, SourceRecord};

/// Main entry point: migrate `input` into `store`.
///
/// With `dry_run` the store may be omitted and is never written.
pub fn migrate(
    input: &MigrationInput,
    store: Option<&mut dyn RecordStore>,
    dry_run: bool,
) -> Result<MigrationReport, SyncError> {
    let mut pipeline = UpsertPipeline::new(store, dry_run)?;
    run_migration(input, &mut pipeline)
}
