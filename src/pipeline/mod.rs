//! Staging and writing canonical records, with per-collection reporting

pub mod report;
pub mod upsert;

pub use report::{CollectionReport, MigrationReport};
pub use upsert::{describe, UpsertPipeline};
