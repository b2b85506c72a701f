//! The single field-renaming table shared by the forward and reverse transformers.
//!
//! Each collection declares its fields once as `(storage name, consumption
//! name, kind)`. The source extractor, both transformers and the REST store's
//! column list all read from here, so the two naming schemes cannot drift.

use crate::types::Collection;

/// How a field's value is typed and normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Quoted string; the literal `null` becomes an explicit null
    Text,
    /// Unquoted digit run
    Integer,
    /// Ordered list of strings
    TextList,
    /// Text normalized to `YYYY-MM-DD`
    Date,
    /// Boolean
    Flag,
    /// Nested object or array, carried verbatim
    Nested,
    /// Any JSON scalar, carried verbatim
    Scalar,
}

/// One row of the renaming table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Underscore-style name used by the store
    pub storage: &'static str,
    /// Camel-style name used by source files and consumption output
    pub consumption: &'static str,
    pub kind: FieldKind,
}

const fn field(storage: &'static str, consumption: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        storage,
        consumption,
        kind,
    }
}

/// The declared fields of one collection
#[derive(Debug)]
pub struct FieldTable {
    collection: Collection,
    fields: &'static [FieldSpec],
}

pub static RESEARCH_FIELDS: FieldTable = FieldTable {
    collection: Collection::Research,
    fields: &[
        field("id", "id", FieldKind::Text),
        field("state", "state", FieldKind::Text),
        field("type", "type", FieldKind::Text),
        field("status", "status", FieldKind::Text),
        field("title", "title", FieldKind::Text),
        field("url", "url", FieldKind::Text),
        field("description", "description", FieldKind::Text),
        field("date", "date", FieldKind::Date),
        field("expected_date", "expectedDate", FieldKind::Date),
        field("author", "author", FieldKind::Text),
        field("source_url", "sourceUrl", FieldKind::Text),
        field("thumbnail", "thumbnail", FieldKind::Text),
        field("key_findings", "keyFindings", FieldKind::TextList),
        field("tags", "tags", FieldKind::TextList),
        field("relevant_states", "relevantStates", FieldKind::TextList),
        field("federal_tool_order", "federalToolOrder", FieldKind::Integer),
    ],
};

/// Impact artifacts are keyed by research id, so `id` is not listed here
pub static IMPACT_FIELDS: FieldTable = FieldTable {
    collection: Collection::ReformImpacts,
    fields: &[
        field("policy_id", "policyId", FieldKind::Scalar),
        field("computed", "computed", FieldKind::Flag),
        field("computed_at", "computedAt", FieldKind::Text),
        field("policyengine_us_version", "policyengineUsVersion", FieldKind::Text),
        field("dataset_name", "datasetName", FieldKind::Text),
        field("dataset_version", "datasetVersion", FieldKind::Text),
        field("budgetary_impact", "budgetaryImpact", FieldKind::Nested),
        field("poverty_impact", "povertyImpact", FieldKind::Nested),
        field("child_poverty_impact", "childPovertyImpact", FieldKind::Nested),
        field("winners_losers", "winnersLosers", FieldKind::Nested),
        field("decile_impact", "decileImpact", FieldKind::Nested),
        field("inequality", "inequality", FieldKind::Nested),
        field("district_impacts", "districtImpacts", FieldKind::Nested),
    ],
};

impl FieldTable {
    /// Table for a collection; `validation_metadata` is pass-through and has none
    pub fn for_collection(collection: Collection) -> Option<&'static FieldTable> {
        match collection {
            Collection::Research => Some(&RESEARCH_FIELDS),
            Collection::ReformImpacts => Some(&IMPACT_FIELDS),
            Collection::ValidationMetadata => None,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn by_storage(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.storage == name)
    }

    pub fn by_consumption(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.consumption == name)
    }

    /// Every storage column, primary key first
    pub fn storage_columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["id"];
        columns.extend(
            self.fields
                .iter()
                .map(|f| f.storage)
                .filter(|name| *name != "id"),
        );
        columns
    }
}
