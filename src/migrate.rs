//! One migration run: legacy source and impact artifact into the store

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::pipeline::{MigrationReport, UpsertPipeline};
use crate::reconcile::reconcile;
use crate::source::extract_records;
use crate::transform::{forward_impact, forward_research};
use crate::types::Collection;
use serde_json::{Map, Value};
use std::io;
use tracing::{debug, info, warn};

/// Everything a migration reads, loaded up front
#[derive(Debug, Clone, Default)]
pub struct MigrationInput {
    pub source_text: String,
    /// Impact artifact: research id -> impact object
    pub impacts: Map<String, Value>,
    pub array_name: String,
}

impl MigrationInput {
    pub fn new(source_text: impl Into<String>, impacts: Map<String, Value>) -> Self {
        MigrationInput {
            source_text: source_text.into(),
            impacts,
            array_name: "research".to_string(),
        }
    }

    /// Read the source file and impact artifact named by `config`.
    ///
    /// A missing artifact is not an error; there is simply nothing to migrate
    /// for impacts.
    pub fn load(config: &SyncConfig) -> Result<Self, SyncError> {
        let source_text =
            std::fs::read_to_string(&config.source_path).map_err(|source| SyncError::Io {
                path: config.source_path.clone(),
                source,
            })?;

        let impacts = match std::fs::read(&config.impacts_path) {
            Ok(bytes) => parse_impacts(bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %config.impacts_path.display(), "impact artifact not found; skipping impacts");
                Map::new()
            }
            Err(source) => {
                return Err(SyncError::Io {
                    path: config.impacts_path.clone(),
                    source,
                })
            }
        };

        Ok(MigrationInput {
            source_text,
            impacts,
            array_name: config.array_name.clone(),
        })
    }
}

/// Parse the impact artifact, which must be a JSON object at the top level
pub fn parse_impacts(mut bytes: Vec<u8>) -> Result<Map<String, Value>, SyncError> {
    // simd-json parses in place; keep a copy for the fallback
    let copy = bytes.clone();
    let value: Value = match simd_json::serde::from_slice(&mut bytes) {
        Ok(value) => value,
        Err(_) => serde_json::from_slice(&copy)
            .map_err(|e| SyncError::Artifact(e.to_string()))?,
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(SyncError::Artifact(format!(
            "top level is {}",
            match other {
                Value::Array(_) => "an array",
                Value::String(_) => "a string",
                Value::Number(_) => "a number",
                Value::Bool(_) => "a boolean",
                _ => "null",
            }
        ))),
    }
}

/// Migrate research records, then their impacts.
///
/// A source format error aborts before anything is written. Store reads and
/// writes that fail are recorded in the report; the impact batch is still
/// attempted after a failed research write, reconciled against what the store
/// already holds.
pub fn run_migration(
    input: &MigrationInput,
    pipeline: &mut UpsertPipeline<'_>,
) -> Result<MigrationReport, SyncError> {
    let mut report = MigrationReport::new(pipeline.is_dry_run());

    let extraction = extract_records(&input.source_text, &input.array_name)?;
    report.ignored_blocks = extraction.ignored;
    info!(
        blocks = extraction.blocks,
        records = extraction.records.len(),
        "scanned research source"
    );

    let research = pipeline.stage(&extraction.records, &mut report.research, forward_research);
    let written_research = pipeline
        .write(Collection::Research, research, &mut report.research)
        .unwrap_or_default();

    let impacts = pipeline.stage(&input.impacts, &mut report.impacts, |(id, impact)| {
        forward_impact(id, impact)
    });

    let mut parents = match pipeline.existing_ids(Collection::Research) {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "could not read existing research ids");
            report.impacts.write_error = Some(e.to_string());
            return Ok(report);
        }
    };
    parents.extend(written_research);

    let reconciliation = reconcile(&parents, &impacts);
    for orphan in &reconciliation.orphans {
        warn!(id = %orphan, "skipping impact: no research record with this id");
    }
    report.impacts.orphans = reconciliation.orphans;

    if let Err(e) = pipeline.write(
        Collection::ReformImpacts,
        reconciliation.valid,
        &mut report.impacts,
    ) {
        debug!(error = %e, "impact batch not written; failure kept on the report");
    }

    Ok(report)
}
