//! Recovery of research records from legacy object-literal source files
//!
//! The source is not parsed with a grammar. The [`Scanner`] finds the
//! exported array and splits it into balanced top-level blocks, and the
//! [`FieldExtractor`] pulls each declared field out of a block on its own.
//! Blocks that do not carry every identity field are ignored.

pub mod fields;
pub mod lexer;
pub mod scanner;

pub use fields::FieldExtractor;
pub use lexer::{Lexer, Token};
pub use scanner::{Blocks, Scanner};

use crate::error::FormatError;
use crate::types::SourceRecord;
use tracing::debug;

/// Result of scanning one source text
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Identifiable records, in source order
    pub records: Vec<SourceRecord>,
    /// Balanced blocks seen
    pub blocks: usize,
    /// Blocks dropped for lacking identity fields
    pub ignored: usize,
}

/// Scan `text` for `export const <array> = [...]` and extract every identifiable record
pub fn extract_records(text: &str, array: &str) -> Result<Extraction, FormatError> {
    let scanner = Scanner::new(text, array)?;
    let extractor = FieldExtractor::research();
    let mut extraction = Extraction::default();

    for block in scanner.blocks() {
        extraction.blocks += 1;
        match extractor.extract(&block) {
            Some(record) if record.is_identifiable() => extraction.records.push(record),
            _ => {
                debug!(
                    start = block.start,
                    end = block.end,
                    "ignoring block without identity fields"
                );
                extraction.ignored += 1;
            }
        }
    }

    Ok(extraction)
}
