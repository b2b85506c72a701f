//! Conversion between source/consumption naming and storage naming
//!
//! Both directions are driven by the tables in [`mapping`]; nothing else in
//! the crate spells out a field rename.

pub mod date;
pub mod forward;
pub mod mapping;
pub mod reverse;

pub use date::{normalize_date, normalize_date_str};
pub use forward::{forward_impact, forward_research};
pub use mapping::{FieldKind, FieldSpec, FieldTable, IMPACT_FIELDS, RESEARCH_FIELDS};
pub use reverse::{reverse, reverse_impact, reverse_research};
