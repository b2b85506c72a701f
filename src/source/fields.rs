use crate::source::lexer::{unescape, Lexer, Token};
use crate::transform::mapping::{FieldKind, FieldTable, RESEARCH_FIELDS};
use crate::types::{FieldValue, RawBlock, SourceRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static RESEARCH_EXTRACTOR: Lazy<FieldExtractor> = Lazy::new(|| {
    FieldExtractor::new(&RESEARCH_FIELDS).expect("research field names are plain identifiers")
});

/// Extraction rule for one declared field
#[derive(Debug, Clone)]
struct FieldRule {
    name: &'static str,
    kind: FieldKind,
    key: Regex,
}

/// Pulls typed fields out of one object block.
///
/// Every field is matched on its own, so a missing or malformed field never
/// affects any other. A key only counts when its colon sits directly inside
/// the block, outside strings and comments.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: Vec<FieldRule>,
}

impl FieldExtractor {
    /// Build rules for every field of `table`, keyed by consumption name
    pub fn new(table: &FieldTable) -> Result<Self, regex::Error> {
        let rules = table
            .fields()
            .iter()
            .map(|spec| {
                Ok(FieldRule {
                    name: spec.consumption,
                    kind: spec.kind,
                    key: key_pattern(spec.consumption)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(FieldExtractor { rules })
    }

    /// Shared extractor for research blocks
    pub fn research() -> &'static FieldExtractor {
        &RESEARCH_EXTRACTOR
    }

    /// Extract every declared field from `block`.
    ///
    /// Returns `None` when not even one identity field is present.
    pub fn extract(&self, block: &RawBlock<'_>) -> Option<SourceRecord> {
        let top_level = top_level_code(block.text);
        let mut record = SourceRecord::new();

        for rule in &self.rules {
            let mut values = rule
                .key
                .find_iter(block.text)
                .map(|m| m.end())
                .filter(|&end| top_level[end - 1]);

            let Some(value_start) = values.next() else {
                continue;
            };
            if values.next().is_some() {
                warn!(
                    field = rule.name,
                    offset = block.start,
                    "field appears more than once in block; keeping the first"
                );
                record.mark_duplicate(rule.name);
            }

            if let Some(value) = read_value(rule.kind, &block.text[value_start..]) {
                record.insert(rule.name, value);
            }
        }

        record.has_any_identity().then_some(record)
    }
}

/// `name:` with the key optionally quoted and not part of a longer identifier
fn key_pattern(name: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"(?:^|[^A-Za-z0-9_$])["']?{}["']?\s*:"#,
        regex::escape(name)
    ))
}

/// Marks which bytes are code directly inside the block's outer braces
fn top_level_code(text: &str) -> Vec<bool> {
    let mut mask = vec![false; text.len()];
    let mut depth = 0usize;

    for (pos, token) in Lexer::new(text) {
        match token {
            Token::Open(_) => depth += 1,
            Token::Close(_) => depth = depth.saturating_sub(1),
            Token::Other(_) => mask[pos] = depth == 1,
            _ => {}
        }
    }
    mask
}

/// Read a value of `kind` from the text right after a key's colon
fn read_value(kind: FieldKind, rest: &str) -> Option<FieldValue> {
    let rest = rest.trim_start();
    match kind {
        FieldKind::Text | FieldKind::Date => {
            if starts_with_null(rest) {
                return Some(FieldValue::Null);
            }
            read_string(rest).map(FieldValue::Text)
        }
        FieldKind::Integer => read_integer(rest).map(FieldValue::Integer),
        FieldKind::TextList => read_string_list(rest).map(FieldValue::List),
        FieldKind::Flag | FieldKind::Nested | FieldKind::Scalar => None,
    }
}

fn starts_with_null(rest: &str) -> bool {
    rest.strip_prefix("null")
        .map(|after| {
            !after
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        })
        .unwrap_or(false)
}

fn read_string(rest: &str) -> Option<String> {
    if !rest.starts_with(['"', '\'', '`']) {
        return None;
    }
    match Lexer::new(rest).next()? {
        (_, Token::Str { raw, .. }) => Some(unescape(raw)),
        _ => None,
    }
}

fn read_integer(rest: &str) -> Option<i64> {
    let sign = usize::from(rest.starts_with('-'));
    let digits = rest[sign..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len() - sign);
    if digits == 0 {
        return None;
    }
    rest[..sign + digits].parse().ok()
}

/// Collect every quoted element of the `[...]` at the start of `rest`, in order.
///
/// A `]` inside a quoted element does not end the list.
fn read_string_list(rest: &str) -> Option<Vec<String>> {
    if !rest.starts_with('[') {
        return None;
    }

    let mut items = Vec::new();
    let mut depth = 0usize;
    for (_, token) in Lexer::new(rest) {
        match token {
            Token::Open('[') => depth += 1,
            Token::Close(']') => {
                depth -= 1;
                if depth == 0 {
                    return Some(items);
                }
            }
            Token::Str { raw, .. } => items.push(unescape(raw)),
            Token::Unterminated => return None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Option<SourceRecord> {
        let block = RawBlock {
            text,
            start: 0,
            end: text.len(),
        };
        FieldExtractor::research().extract(&block)
    }

    fn list(items: &[&str]) -> FieldValue {
        FieldValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_bracket_inside_array_element() {
        let record = extract(r#"{id: "a", tags: ["x]", "y"], title: "T"}"#).unwrap();

        assert_eq!(record.get("tags"), Some(&list(&["x]", "y"])));
        assert_eq!(record.text("id"), Some("a"));
        assert_eq!(record.text("title"), Some("T"));
    }

    #[test]
    fn test_block_without_identity_fields() {
        assert!(extract(r#"{foo: "bar"}"#).is_none());
    }

    #[test]
    fn test_partial_identity_is_extracted_but_not_identifiable() {
        let record = extract(r#"{ id: "a", state: "UT" }"#).unwrap();
        assert!(!record.is_identifiable());
    }

    #[test]
    fn test_typed_fields() {
        let record = extract(
            r#"{
    id: "ut-flat-tax",
    state: "UT",
    type: "blog",
    title: 'Utah\'s flat tax',
    date: "2025-Q3",
    federalToolOrder: 4,
    thumbnail: null,
    keyFindings: [
      "Revenue falls by $100M",
      'Top decile gains most',
    ],
    relevantStates: [],
  }"#,
        )
        .unwrap();

        assert!(record.is_identifiable());
        assert_eq!(record.text("title"), Some("Utah's flat tax"));
        assert_eq!(record.text("date"), Some("2025-Q3"));
        assert_eq!(record.get("federalToolOrder"), Some(&FieldValue::Integer(4)));
        assert_eq!(record.get("thumbnail"), Some(&FieldValue::Null));
        assert_eq!(
            record.get("keyFindings"),
            Some(&list(&["Revenue falls by $100M", "Top decile gains most"]))
        );
        assert_eq!(record.get("relevantStates"), Some(&list(&[])));
    }

    #[test]
    fn test_keys_inside_strings_are_ignored() {
        let record =
            extract(r#"{ id: "a", description: "title: \"fake\", state: 'XX'", title: "Real" }"#)
                .unwrap();
        assert_eq!(record.text("title"), Some("Real"));
        assert_eq!(record.get("state"), None);
    }

    #[test]
    fn test_nested_keys_are_ignored() {
        let record = extract(r#"{ id: "a", meta: { title: "nested" }, title: "Top" }"#).unwrap();
        assert_eq!(record.text("title"), Some("Top"));

        let record = extract(r#"{ id: "a", meta: { title: "nested" } }"#).unwrap();
        assert_eq!(record.get("title"), None);
    }

    #[test]
    fn test_similar_key_names_do_not_collide() {
        let record = extract(
            r#"{ sourceUrl: "s", url: "u", expectedDate: "2026", date: "2025", subtype: "x", type: "tool", id: "a" }"#,
        )
        .unwrap();

        assert_eq!(record.text("url"), Some("u"));
        assert_eq!(record.text("sourceUrl"), Some("s"));
        assert_eq!(record.text("date"), Some("2025"));
        assert_eq!(record.text("expectedDate"), Some("2026"));
        assert_eq!(record.text("type"), Some("tool"));
    }

    #[test]
    fn test_quoted_keys() {
        let record = extract(r#"{ "id": "a", 'title': "T" }"#).unwrap();
        assert_eq!(record.text("id"), Some("a"));
        assert_eq!(record.text("title"), Some("T"));
    }

    #[test]
    fn test_first_match_wins_and_duplicate_is_recorded() {
        let record = extract(r#"{ id: "first", title: "T", id: "second" }"#).unwrap();
        assert_eq!(record.text("id"), Some("first"));
        assert_eq!(record.duplicates(), ["id".to_string()]);
    }

    #[test]
    fn test_malformed_field_does_not_block_others() {
        let record = extract(
            r#"{ id: "a", tags: [unquoted, "ok"], federalToolOrder: "x", date: 2025, state: "UT", keyFindings: "not a list", title: "T" }"#,
        )
        .unwrap();

        assert_eq!(record.get("tags"), Some(&list(&["ok"])));
        assert_eq!(record.get("federalToolOrder"), None);
        assert_eq!(record.get("date"), None);
        assert_eq!(record.get("keyFindings"), None);
        assert_eq!(record.text("state"), Some("UT"));
        assert_eq!(record.text("title"), Some("T"));
    }

    #[test]
    fn test_integer_overflow_is_absent() {
        let record = extract(r#"{ id: "a", federalToolOrder: 99999999999999999999 }"#).unwrap();
        assert_eq!(record.get("federalToolOrder"), None);
    }

    #[test]
    fn test_null_prefix_is_not_null() {
        let record = extract(r#"{ id: "a", author: nullable }"#).unwrap();
        assert_eq!(record.get("author"), None);
    }
}
