//! Turning JSON payloads into flat rows.
//!
//! Two strategies exist: direct lookup of an endpoint's expected keys, and
//! recursive flattening where object keys and array indices become
//! `/`-joined path segments. List-valued fields can additionally be
//! expanded into one sub-row per element.

use crate::core::endpoint::{EndpointDescriptor, OutputField};
use crate::domain::model::{ExpandedRow, FlattenedRow, VerificationResult};
use serde_json::Value;

pub const PATH_SEPARATOR: &str = "/";
pub const SCALAR_ELEMENT_COLUMN: &str = "value";

static NULL: Value = Value::Null;

/// Renders a leaf for a table cell. Nested values become compact JSON.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// `null`, `{}`, `[]`, `""` and `false` carry no verification data.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

/// Resolves paths such as `data.pan_number`, `items[0].name` or
/// `addresses[-1]`. A key present verbatim wins over path interpretation.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(found) = value.get(path) {
        return Some(found);
    }

    let mut current = value;
    for segment in path.split('.') {
        let (key, indices) = split_indices(segment)?;
        if !key.is_empty() {
            current = current.get(key)?;
        }
        for index in indices {
            let items = current.as_array()?;
            let position = if index < 0 {
                items.len().checked_sub(index.unsigned_abs() as usize)?
            } else {
                index as usize
            };
            current = items.get(position)?;
        }
    }
    Some(current)
}

fn split_indices(segment: &str) -> Option<(&str, Vec<i64>)> {
    let (key, mut rest) = match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => return Some((segment, Vec::new())),
    };

    let mut indices = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let end = inner.find(']')?;
        indices.push(inner[..end].trim().parse().ok()?);
        rest = &inner[end + 1..];
    }
    Some((key, indices))
}

/// The part of the payload holding verification data.
pub fn data_root<'a>(payload: &'a Value, descriptor: &EndpointDescriptor) -> &'a Value {
    match &descriptor.response_root {
        Some(root) => lookup_path(payload, root).unwrap_or(&NULL),
        None => payload,
    }
}

/// One column per expected key; absent keys render as `""`.
pub fn flatten(payload: &Value, expected_keys: &[OutputField]) -> FlattenedRow {
    let mut row = FlattenedRow::new();
    for field in expected_keys {
        let value = lookup_path(payload, field.path())
            .map(render_scalar)
            .unwrap_or_default();
        row.insert(field.column(), value);
    }
    row
}

pub fn flatten_recursive(payload: &Value, separator: &str) -> FlattenedRow {
    let mut row = FlattenedRow::new();
    walk(payload, String::new(), separator, &mut row);
    row
}

fn walk(value: &Value, prefix: String, separator: &str, row: &mut FlattenedRow) {
    let join = |segment: &str| {
        if prefix.is_empty() {
            segment.to_string()
        } else {
            format!("{}{}{}", prefix, separator, segment)
        }
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, join(key), separator, row);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, join(&index.to_string()), separator, row);
            }
        }
        leaf => row.insert(prefix, render_scalar(leaf)),
    }
}

/// One row per element of `list_field`, numbered from 1.
pub fn expand(
    payload: &Value,
    list_field: &str,
    serial: &str,
    join_values: &[String],
) -> Vec<ExpandedRow> {
    let items = match lookup_path(payload, list_field).and_then(Value::as_array) {
        Some(items) => items,
        None => return Vec::new(),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let fields = match item {
                Value::Object(_) | Value::Array(_) => flatten_recursive(item, PATH_SEPARATOR),
                scalar => {
                    let mut row = FlattenedRow::new();
                    row.insert(SCALAR_ELEMENT_COLUMN, render_scalar(scalar));
                    row
                }
            };
            ExpandedRow {
                serial: serial.to_string(),
                join_values: join_values.to_vec(),
                sub_serial: i + 1,
                fields,
            }
        })
        .collect()
}

/// The `valid` flag and `message` text shown for a result. A successful
/// call defers to the API's own verdict and message when it sends them.
pub fn verdict(result: &VerificationResult, descriptor: &EndpointDescriptor) -> (bool, String) {
    if !result.success {
        return (false, result.message.clone());
    }

    let root = data_root(&result.payload, descriptor);
    let valid = match root.get(&descriptor.valid_field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.eq_ignore_ascii_case("false"),
        _ => descriptor.valid_default,
    };
    let message = root
        .get(&descriptor.message_field)
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| result.message.clone());

    (valid, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::{builtin_endpoints, find_endpoint};
    use crate::domain::model::{FailureKind, MSG_NO_DATA, MSG_VERIFIED};
    use serde_json::json;

    fn keys(names: &[&str]) -> Vec<OutputField> {
        names.iter().map(|n| OutputField::Key(n.to_string())).collect()
    }

    #[test]
    fn test_render_scalar() {
        assert_eq!(render_scalar(&json!(null)), "");
        assert_eq!(render_scalar(&json!("Jane")), "Jane");
        assert_eq!(render_scalar(&json!(true)), "true");
        assert_eq!(render_scalar(&json!(42)), "42");
        assert_eq!(render_scalar(&json!(1.5)), "1.5");
        assert_eq!(render_scalar(&json!(["A", "B"])), "[\"A\",\"B\"]");
    }

    #[test]
    fn test_is_falsy() {
        for value in [json!(null), json!({}), json!([]), json!(""), json!(false)] {
            assert!(is_falsy(&value), "{} should be falsy", value);
        }
        for value in [json!({"a": 1}), json!([0]), json!("x"), json!(true), json!(0)] {
            assert!(!is_falsy(&value), "{} should not be falsy", value);
        }
    }

    #[test]
    fn test_lookup_path() {
        let payload = json!({
            "data": {"pan_number": "ABCDE1234F"},
            "items": [{"name": "first"}, {"name": "last"}],
            "odd.key": 1
        });
        assert_eq!(lookup_path(&payload, "data.pan_number"), Some(&json!("ABCDE1234F")));
        assert_eq!(lookup_path(&payload, "items[0].name"), Some(&json!("first")));
        assert_eq!(lookup_path(&payload, "items[-1].name"), Some(&json!("last")));
        assert_eq!(lookup_path(&payload, "odd.key"), Some(&json!(1)));
        assert_eq!(lookup_path(&payload, "items[5]"), None);
        assert_eq!(lookup_path(&payload, "items[-3]"), None);
        assert_eq!(lookup_path(&payload, "data.missing"), None);
        assert_eq!(lookup_path(&payload, "items[x]"), None);
    }

    #[test]
    fn test_flatten_direct_keys() {
        let payload = json!({"valid": true, "name": "Jane Doe", "extra": "ignored"});
        let row = flatten(&payload, &keys(&["valid", "name", "category"]));

        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["valid", "name", "category"]);
        assert_eq!(row.get("name"), Some("Jane Doe"));
        assert_eq!(row.get("category"), Some(""));
        assert_eq!(row.get("extra"), None);
    }

    #[test]
    fn test_flatten_mapped_paths() {
        let payload = json!({"data": {"credit_score": 780}});
        let fields = vec![OutputField::Mapped {
            column: "credit_score".to_string(),
            path: "data.credit_score".to_string(),
        }];
        assert_eq!(flatten(&payload, &fields).get("credit_score"), Some("780"));
    }

    #[test]
    fn test_flatten_recursive_paths() {
        let payload = json!({
            "result": {
                "gstList": [
                    {"gstin": "27AAA", "state": "MH"},
                    {"gstin": "29AAA", "state": "KA"}
                ],
                "count": 2,
                "empty": {}
            }
        });
        let row = flatten_recursive(&payload, PATH_SEPARATOR);

        assert_eq!(row.get("result/gstList/0/gstin"), Some("27AAA"));
        assert_eq!(row.get("result/gstList/1/state"), Some("KA"));
        assert_eq!(row.get("result/count"), Some("2"));
        assert_eq!(row.get("result/empty"), None);
        assert_eq!(row.len(), 5);
    }

    #[test]
    fn test_flatten_recursive_keeps_response_key_order() {
        let payload: Value =
            serde_json::from_str(r#"{"zeta": 1, "alpha": {"y": 2, "b": 3}}"#).unwrap();
        let row = flatten_recursive(&payload, PATH_SEPARATOR);
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["zeta", "alpha/y", "alpha/b"]);

        let rows = expand(&json!({"items": [{"name": "Acme", "cin": "U1"}]}), "items", "1", &[]);
        assert_eq!(rows[0].fields.keys().collect::<Vec<_>>(), vec!["name", "cin"]);
    }

    #[test]
    fn test_expand_list_field() {
        let payload = json!({
            "categories": [
                {"cov": "LMV", "issued": "2015-01-01"},
                {"cov": "MCWG", "issued": "2016-01-01"},
                "TRANS"
            ]
        });
        let rows = expand(&payload, "categories", "3", &["DL123".to_string()]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].sub_serial, 1);
        assert_eq!(rows[0].fields.get("cov"), Some("LMV"));
        assert_eq!(rows[1].fields.get("issued"), Some("2016-01-01"));
        assert_eq!(rows[2].sub_serial, 3);
        assert_eq!(rows[2].fields.get(SCALAR_ELEMENT_COLUMN), Some("TRANS"));
        assert!(rows.iter().all(|r| r.serial == "3" && r.join_values == vec!["DL123"]));
    }

    #[test]
    fn test_expand_absent_or_non_list_is_empty() {
        assert!(expand(&json!({}), "items", "1", &[]).is_empty());
        assert!(expand(&json!({"items": []}), "items", "1", &[]).is_empty());
        assert!(expand(&json!({"items": "n/a"}), "items", "1", &[]).is_empty());
    }

    #[test]
    fn test_verdict() {
        let catalog = builtin_endpoints();
        let pan = find_endpoint(&catalog, "pan").unwrap();

        let result = VerificationResult::succeeded(json!({"valid": false, "message": "Invalid PAN"}));
        assert_eq!(verdict(&result, pan), (false, "Invalid PAN".to_string()));

        let result = VerificationResult::succeeded(json!({"valid": true, "name": "Jane Doe"}));
        assert_eq!(verdict(&result, pan), (true, MSG_VERIFIED.to_string()));

        let result = VerificationResult::failed(FailureKind::NoDataReturned, MSG_NO_DATA);
        assert_eq!(verdict(&result, pan), (false, MSG_NO_DATA.to_string()));
    }

    #[test]
    fn test_verdict_falls_back_to_descriptor_default() {
        let catalog = builtin_endpoints();
        let court = find_endpoint(&catalog, "court-person").unwrap();
        let result = VerificationResult::succeeded(json!({"casesCount": 0}));
        assert_eq!(verdict(&result, court), (false, MSG_VERIFIED.to_string()));

        let result = VerificationResult::succeeded(json!({"valid": true, "casesCount": 2}));
        assert!(verdict(&result, court).0);

        let probe42 = find_endpoint(&catalog, "probe42-company").unwrap();
        let result = VerificationResult::succeeded(json!({"data": {"company": {"cin": "U1"}}}));
        assert!(verdict(&result, probe42).0);
    }

    #[test]
    fn test_verdict_reads_response_root() {
        let catalog = builtin_endpoints();
        let credit = find_endpoint(&catalog, "credit-score").unwrap();

        let result = VerificationResult::succeeded(json!({
            "code": 200,
            "result": {"success": false, "message": "Consumer not found"}
        }));
        assert_eq!(verdict(&result, credit), (false, "Consumer not found".to_string()));
    }
}
