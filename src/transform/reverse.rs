use crate::error::RecordTransformError;
use crate::transform::mapping::{FieldTable, IMPACT_FIELDS, RESEARCH_FIELDS};
use crate::types::RecordId;
use serde_json::{Map, Value};

/// Rename a stored row to consumption names through `table`.
///
/// Null or absent values are left out, as are columns the table does not declare.
pub fn reverse(table: &FieldTable, stored: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for spec in table.fields() {
        match stored.get(spec.storage) {
            None | Some(Value::Null) => {}
            Some(value) => {
                out.insert(spec.consumption.to_string(), value.clone());
            }
        }
    }
    out
}

pub fn reverse_research(stored: &Map<String, Value>) -> Map<String, Value> {
    reverse(&RESEARCH_FIELDS, stored)
}

/// Split a stored impact row into its id and consumption-format body
pub fn reverse_impact(
    stored: &Map<String, Value>,
) -> Result<(RecordId, Map<String, Value>), RecordTransformError> {
    let id = stored
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RecordTransformError::new("<missing>", "stored impact has no `id`"))?;

    Ok((RecordId::new(id), reverse(&IMPACT_FIELDS, stored)))
}
