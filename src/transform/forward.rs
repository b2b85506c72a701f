use crate::error::RecordTransformError;
use crate::transform::date::normalize_date_str;
use crate::transform::mapping::{FieldKind, FieldSpec, IMPACT_FIELDS, RESEARCH_FIELDS};
use crate::types::{
    CanonicalRecord, Collection, FieldValue, ParentRef, RecordId, SourceRecord, IDENTITY_FIELDS,
};
use serde_json::{Map, Value};
use tracing::debug;

const DEFAULT_STATUS: &str = "published";

/// Map a research source record onto its storage form.
///
/// Renames every field through the research table, normalizes dates and
/// applies defaults. Absent values, explicit nulls and unrecognized dates are
/// all left out of the result.
pub fn forward_research(source: &SourceRecord) -> Result<CanonicalRecord, RecordTransformError> {
    let id = source
        .id()
        .ok_or_else(|| RecordTransformError::new("<unknown>", "missing `id`"))?;

    if let Some(missing) = IDENTITY_FIELDS.iter().find(|f| source.text(f).is_none()) {
        return Err(RecordTransformError::new(
            id,
            format!("missing required field `{missing}`"),
        ));
    }

    let mut data = Map::new();
    for spec in RESEARCH_FIELDS.fields() {
        let Some(value) = source.get(spec.consumption) else {
            continue;
        };
        if let Some(value) = research_value(id, spec, value)? {
            data.insert(spec.storage.to_string(), value);
        }
    }

    data.entry("status")
        .or_insert_with(|| Value::String(DEFAULT_STATUS.to_string()));
    data.entry("key_findings")
        .or_insert_with(|| Value::Array(Vec::new()));
    data.entry("tags").or_insert_with(|| Value::Array(Vec::new()));

    Ok(CanonicalRecord::new(
        Collection::Research,
        RecordId::new(id),
        data,
    ))
}

fn research_value(
    id: &str,
    spec: &FieldSpec,
    value: &FieldValue,
) -> Result<Option<Value>, RecordTransformError> {
    match (spec.kind, value) {
        (_, FieldValue::Null) => Ok(None),
        (FieldKind::Date, FieldValue::Text(raw)) => {
            let normalized = normalize_date_str(raw);
            if normalized.is_none() {
                debug!(id, field = spec.consumption, raw = raw.as_str(), "unrecognized date dropped");
            }
            Ok(normalized.map(Value::String))
        }
        (FieldKind::Text, FieldValue::Text(_))
        | (FieldKind::Integer, FieldValue::Integer(_))
        | (FieldKind::TextList, FieldValue::List(_)) => Ok(Some(Value::from(value))),
        (kind, other) => Err(RecordTransformError::new(
            id,
            format!(
                "field `{}` expects {:?}, found {:?}",
                spec.consumption, kind, other
            ),
        )),
    }
}

/// Map one entry of the impact artifact onto its storage form.
///
/// `id` is the artifact key and must name a research record. Nested impact
/// structures are carried verbatim and must be objects or arrays when present.
pub fn forward_impact(id: &str, impact: &Value) -> Result<CanonicalRecord, RecordTransformError> {
    if id.is_empty() {
        return Err(RecordTransformError::new(id, "empty record id"));
    }
    let Value::Object(impact) = impact else {
        return Err(RecordTransformError::new(id, "impact entry is not an object"));
    };

    let mut data = Map::new();
    for spec in IMPACT_FIELDS.fields() {
        match impact.get(spec.consumption) {
            None | Some(Value::Null) => {}
            Some(value) if matches_kind(spec.kind, value) => {
                data.insert(spec.storage.to_string(), value.clone());
            }
            Some(value) => {
                return Err(RecordTransformError::new(
                    id,
                    format!(
                        "field `{}` expects {:?}, found {}",
                        spec.consumption,
                        spec.kind,
                        json_type(value)
                    ),
                ));
            }
        }
    }
    data.entry("computed").or_insert(Value::Bool(true));

    Ok(
        CanonicalRecord::new(Collection::ReformImpacts, RecordId::new(id), data).with_parent(
            ParentRef {
                collection: Collection::Research,
                id: RecordId::new(id),
            },
        ),
    )
}

fn matches_kind(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::Text | FieldKind::Date => value.is_string(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::TextList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        FieldKind::Flag => value.is_boolean(),
        FieldKind::Nested => value.is_object() || value.is_array(),
        FieldKind::Scalar => !(value.is_object() || value.is_array()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn identified() -> SourceRecord {
        SourceRecord::new()
            .with("id", text("ut-flat-tax"))
            .with("state", text("UT"))
            .with("type", text("blog"))
            .with("title", text("Utah flat tax"))
    }

    #[test]
    fn test_forward_research_renames_and_defaults() {
        let source = identified()
            .with("expectedDate", text("2026-Q2"))
            .with("federalToolOrder", FieldValue::Integer(2))
            .with("relevantStates", FieldValue::List(vec!["UT".into(), "ID".into()]));

        let record = forward_research(&source).unwrap();

        assert_eq!(record.collection, Collection::Research);
        assert_eq!(record.id.as_str(), "ut-flat-tax");
        assert_eq!(
            Value::Object(record.data),
            json!({
                "id": "ut-flat-tax",
                "state": "UT",
                "type": "blog",
                "title": "Utah flat tax",
                "status": "published",
                "expected_date": "2026-04-01",
                "federal_tool_order": 2,
                "relevant_states": ["UT", "ID"],
                "key_findings": [],
                "tags": [],
            })
        );
    }

    #[test]
    fn test_forward_research_omits_nulls_and_bad_dates() {
        let source = identified()
            .with("thumbnail", FieldValue::Null)
            .with("date", text("TBD"))
            .with("status", text("in_progress"));

        let record = forward_research(&source).unwrap();

        assert!(!record.data.contains_key("thumbnail"));
        assert!(!record.data.contains_key("date"));
        assert_eq!(record.text("status"), Some("in_progress"));
    }

    #[test]
    fn test_forward_research_requires_identity() {
        let source = SourceRecord::new()
            .with("id", text("a"))
            .with("state", text("UT"));
        let err = forward_research(&source).unwrap_err();

        assert_eq!(err.id.as_str(), "a");
        assert!(err.reason.contains("type"));
    }

    #[test]
    fn test_forward_research_rejects_mistyped_field() {
        let source = identified().with("tags", text("not-a-list"));
        let err = forward_research(&source).unwrap_err();
        assert!(err.reason.contains("tags"));
    }

    #[test]
    fn test_forward_impact() {
        let artifact = json!({
            "policyId": 91234,
            "computedAt": "2025-06-01 12:00:00",
            "budgetaryImpact": {"netCost": -120000000.0, "households": 1100000},
            "decileImpact": [0.1, 0.2],
            "state": "UT",
            "districtImpacts": null
        });

        let record = forward_impact("ut-flat-tax", &artifact).unwrap();

        assert_eq!(record.collection, Collection::ReformImpacts);
        assert_eq!(record.parent_key().as_str(), "ut-flat-tax");
        assert_eq!(
            Value::Object(record.data),
            json!({
                "id": "ut-flat-tax",
                "policy_id": 91234,
                "computed": true,
                "computed_at": "2025-06-01 12:00:00",
                "budgetary_impact": {"netCost": -120000000.0, "households": 1100000},
                "decile_impact": [0.1, 0.2],
            })
        );
    }

    #[test]
    fn test_forward_impact_rejects_partial_structures() {
        let err = forward_impact("a", &json!({"povertyImpact": 0.12})).unwrap_err();
        assert!(err.reason.contains("povertyImpact"));

        let err = forward_impact("a", &json!({"computed": "yes"})).unwrap_err();
        assert!(err.reason.contains("computed"));

        let err = forward_impact("a", &json!([1, 2])).unwrap_err();
        assert_eq!(err.reason, "impact entry is not an object");

        assert!(forward_impact("", &json!({})).is_err());
    }

    #[test]
    fn test_forward_impact_keeps_explicit_false() {
        let record = forward_impact("a", &json!({"computed": false})).unwrap();
        assert_eq!(record.get("computed"), Some(&Value::Bool(false)));
    }
}
