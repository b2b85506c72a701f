use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Fields that must all be present and non-empty for a block to count as a research item
pub const IDENTITY_FIELDS: [&str; 4] = ["id", "state", "type", "title"];

/// Primary key shared by every collection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::new(id)
    }
}

/// A collection in the destination store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Research,
    ReformImpacts,
    ValidationMetadata,
}

impl Collection {
    /// Table name as the store knows it
    pub fn table_name(self) -> &'static str {
        match self {
            Collection::Research => "research",
            Collection::ReformImpacts => "reform_impacts",
            Collection::ValidationMetadata => "validation_metadata",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A text span believed to be one source object literal.
///
/// `start` points at the opening brace and `end` one past the closing brace,
/// both as byte offsets into the scanned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// A loosely-typed value pulled out of a source block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    List(Vec<String>),
    /// The literal `null` token
    Null,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Integer(n) => Value::Number((*n).into()),
            FieldValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            FieldValue::Null => Value::Null,
        }
    }
}

/// Fields extracted from exactly one [`RawBlock`], keyed by their source name.
///
/// Insertion order follows the field table, not the block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    fields: Vec<(String, FieldValue)>,
    duplicates: Vec<String>,
}

impl SourceRecord {
    pub fn new() -> Self {
        SourceRecord::default()
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Non-empty text value of a field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.is_empty())
    }

    pub fn id(&self) -> Option<&str> {
        self.text("id")
    }

    /// True when every identity field carries non-empty text
    pub fn is_identifiable(&self) -> bool {
        IDENTITY_FIELDS.iter().all(|f| self.text(f).is_some())
    }

    /// True when at least one identity field is present in any form
    pub fn has_any_identity(&self) -> bool {
        IDENTITY_FIELDS.iter().any(|f| self.get(f).is_some())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn mark_duplicate(&mut self, name: &str) {
        if !self.duplicates.iter().any(|d| d == name) {
            self.duplicates.push(name.to_string());
        }
    }

    /// Fields that appeared more than once in the source block
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }
}

/// Reference from a child record to the record it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub collection: Collection,
    pub id: RecordId,
}

/// A normalized, storage-ready record - one row in a collection
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub collection: Collection,

    /// Primary key, mirrored in `data["id"]`
    pub id: RecordId,

    /// Storage-named fields, absent values omitted
    pub data: Map<String, Value>,

    /// Parent record this one must not outlive
    pub parent: Option<ParentRef>,
}

impl CanonicalRecord {
    pub fn new(collection: Collection, id: RecordId, mut data: Map<String, Value>) -> Self {
        data.insert("id".to_string(), Value::String(id.0.clone()));
        CanonicalRecord {
            collection,
            id,
            data,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: ParentRef) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Key the reconciler checks against the parent collection
    pub fn parent_key(&self) -> &RecordId {
        self.parent.as_ref().map(|p| &p.id).unwrap_or(&self.id)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_gate() {
        let record = SourceRecord::new()
            .with("id", FieldValue::Text("ut-flat-tax".into()))
            .with("state", FieldValue::Text("UT".into()))
            .with("type", FieldValue::Text("blog".into()));
        assert!(!record.is_identifiable());
        assert!(record.has_any_identity());

        let record = record.with("title", FieldValue::Text(String::new()));
        assert!(!record.is_identifiable());

        let record = record.with("title", FieldValue::Text("Utah flat tax".into()));
        assert!(record.is_identifiable());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = SourceRecord::new();
        record.insert("id", FieldValue::Text("a".into()));
        record.insert("tags", FieldValue::List(vec!["x".into()]));
        record.insert("id", FieldValue::Text("b".into()));

        let names: Vec<&str> = record.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["id", "tags"]);
        assert_eq!(record.id(), Some("b"));
    }

    #[test]
    fn test_canonical_record_mirrors_id() {
        let record = CanonicalRecord::new(
            Collection::ReformImpacts,
            RecordId::new("ut-flat-tax"),
            serde_json::from_value(json!({"computed": true})).unwrap(),
        )
        .with_parent(ParentRef {
            collection: Collection::Research,
            id: RecordId::new("ut-flat-tax"),
        });

        assert_eq!(record.text("id"), Some("ut-flat-tax"));
        assert_eq!(record.parent_key().as_str(), "ut-flat-tax");
        assert_eq!(Value::from(&FieldValue::Integer(3)), json!(3));
    }
}
