use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Collection, RecordId};

/// The source text is not in the expected container shape at all.
///
/// Fatal to the run, unlike per-record problems.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("could not find `export const {array} = [` in source text")]
    MissingArrayStart { array: String },
    #[error("array `{array}` opened at byte {offset} is never closed")]
    UnclosedArray { array: String, offset: usize },
}

/// A single record could not be transformed; the record is skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("record '{id}': {reason}")]
pub struct RecordTransformError {
    pub id: RecordId,
    pub reason: String,
}

impl RecordTransformError {
    pub fn new(id: impl Into<RecordId>, reason: impl Into<String>) -> Self {
        RecordTransformError {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// A store call failed. Fatal to the current batch, not to the process.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no destination store is configured")]
    NotConfigured,
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to '{collection}' failed: {source}")]
    Transport {
        collection: Collection,
        #[source]
        source: reqwest::Error,
    },
    #[error("store rejected request to '{collection}' with status {status}: {body}")]
    Rejected {
        collection: Collection,
        status: u16,
        body: String,
    },
    #[error("could not decode response from '{collection}': {details}")]
    Decode {
        collection: Collection,
        details: String,
    },
    #[error("store unavailable for '{collection}': {reason}")]
    Unavailable {
        collection: Collection,
        reason: String,
    },
}

/// Top-level error for a migration or mirror run
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("impact artifact is not a JSON object keyed by record id: {0}")]
    Artifact(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}
