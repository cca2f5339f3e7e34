//! Record extraction and diagnostic walking over parsed JSON trees.
//!
//! # Design
//! The node model is `serde_json::Value`; this module only walks it. Node
//! kind is a tagged variant matched exhaustively — the taxonomy carries
//! `Invalid` and `Raw` because the wire contract names them, even though
//! `serde_json` never produces either; walkers report them as unsupported
//! rather than interpreting them.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::types::Customer;

/// Tag for one node in a JSON tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Invalid,
    False,
    True,
    Null,
    Number,
    String,
    Array,
    Object,
    Raw,
}

impl NodeKind {
    pub fn of(value: &Value) -> NodeKind {
        match value {
            Value::Null => NodeKind::Null,
            Value::Bool(false) => NodeKind::False,
            Value::Bool(true) => NodeKind::True,
            Value::Number(_) => NodeKind::Number,
            Value::String(_) => NodeKind::String,
            Value::Array(_) => NodeKind::Array,
            Value::Object(_) => NodeKind::Object,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Invalid => "Invalid",
            NodeKind::False => "False",
            NodeKind::True => "True",
            NodeKind::Null => "Null",
            NodeKind::Number => "Number",
            NodeKind::String => "String",
            NodeKind::Array => "Array",
            NodeKind::Object => "Object",
            NodeKind::Raw => "Raw",
        }
    }
}

/// Extract typed records from a response tree: an array yields every
/// element, a single object yields a one-element set. A missing or
/// mistyped `id`/`name`/`gender` fails the whole call — elements are never
/// silently skipped.
pub fn extract_records(root: &Value) -> Result<Vec<Customer>, ClientError> {
    match root {
        Value::Array(items) => items.iter().map(record_from_object).collect(),
        Value::Object(_) => Ok(vec![record_from_object(root)?]),
        other => Err(ClientError::Shape(format!(
            "expected an object or array of records, got {}",
            NodeKind::of(other).label()
        ))),
    }
}

fn record_from_object(value: &Value) -> Result<Customer, ClientError> {
    let Some(object) = value.as_object() else {
        return Err(ClientError::Shape(format!(
            "expected a record object, got {}",
            NodeKind::of(value).label()
        )));
    };
    Ok(Customer {
        id: integer_field(object, "id")?,
        name: string_field(object, "name")?,
        gender: integer_field(object, "gender")?,
    })
}

fn integer_field(object: &Map<String, Value>, key: &str) -> Result<i64, ClientError> {
    object
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ClientError::Shape(format!("missing integer field `{key}`")))
}

fn string_field(object: &Map<String, Value>, key: &str) -> Result<String, ClientError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::Shape(format!("missing string field `{key}`")))
}

/// The id of the **last** element visited in a result set.
///
/// The max-id query asks the server for `order=desc`, and this walk trusts
/// that sort instead of computing a numeric maximum — an unsorted result
/// set yields whatever id happens to come last. `None` means the set was
/// empty (or not an array): callers must treat it as "no retrievable id",
/// never as a usable identifier.
pub fn extract_max_id(root: &Value) -> Option<i64> {
    let items = root.as_array()?;
    let mut last = None;
    for item in items {
        last = item.get("id").and_then(Value::as_i64);
    }
    last
}

/// Diagnostic print of every record in a response, field by field.
pub fn print_records(root: &Value) {
    info!("-----------------------------------------");
    match root {
        Value::Array(items) => {
            for item in items {
                print_record(item);
            }
        }
        _ => print_record(root),
    }
    info!("-----------------------------------------");
}

fn print_record(value: &Value) {
    match (value.get("id"), value.get("name"), value.get("gender")) {
        (Some(id), Some(name), Some(gender)) => {
            info!("{}\t{}\t{}", id, name.as_str().unwrap_or_default(), gender);
        }
        _ => warn!("record is missing id/name/gender"),
    }
}

/// One visited node during a generic walk.
pub struct WalkEntry<'a> {
    /// Member name when the node is an object field.
    pub name: Option<&'a str>,
    pub kind: NodeKind,
    pub value: &'a Value,
}

/// Recursively visit every child of `root` in document order, reporting the
/// member name (if any) and kind of each node and descending into arrays
/// and objects.
pub fn walk<'a>(root: &'a Value, visit: &mut dyn FnMut(WalkEntry<'a>)) {
    match root {
        Value::Array(items) => {
            for item in items {
                visit_node(None, item, visit);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                visit_node(Some(key.as_str()), item, visit);
            }
        }
        _ => {}
    }
}

fn visit_node<'a>(name: Option<&'a str>, value: &'a Value, visit: &mut dyn FnMut(WalkEntry<'a>)) {
    visit(WalkEntry {
        name,
        kind: NodeKind::of(value),
        value,
    });
    if matches!(value, Value::Array(_) | Value::Object(_)) {
        walk(value, visit);
    }
}

/// Log every node of an arbitrary document. Purely diagnostic.
pub fn analyze(root: &Value) {
    walk(root, &mut |entry| {
        if let Some(name) = entry.name {
            info!("[{name}]");
        }
        match entry.kind {
            NodeKind::Invalid => info!("Invalid"),
            NodeKind::False => info!("False"),
            NodeKind::True => info!("True"),
            NodeKind::Null => info!("Null"),
            NodeKind::Number => info!(
                "int={} double={}",
                entry.value.as_i64().unwrap_or_default(),
                entry.value.as_f64().unwrap_or_default()
            ),
            NodeKind::String => info!("{}", entry.value.as_str().unwrap_or_default()),
            NodeKind::Array => debug!("Array"),
            NodeKind::Object => debug!("Object"),
            NodeKind::Raw => info!("Raw (not supported)"),
        }
    });
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_records_from_an_array() {
        let root = json!([
            {"id": 1, "name": "Tom", "gender": 1},
            {"id": 2, "name": "Anna", "gender": 2},
        ]);
        let records = extract_records(&root).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Customer { id: 1, name: "Tom".to_string(), gender: 1 });
        assert_eq!(records[1].name, "Anna");
    }

    #[test]
    fn single_object_is_a_one_element_set() {
        let root = json!({"id": 3, "name": "Ben", "gender": 1});
        let records = extract_records(&root).unwrap();
        assert_eq!(records, vec![Customer { id: 3, name: "Ben".to_string(), gender: 1 }]);
    }

    #[test]
    fn missing_field_fails_the_whole_extraction() {
        let root = json!([
            {"id": 1, "name": "Tom", "gender": 1},
            {"id": 2, "name": "Anna"},
        ]);
        let err = extract_records(&root).unwrap_err();
        assert!(matches!(err, ClientError::Shape(_)));
    }

    #[test]
    fn mistyped_field_is_a_shape_error() {
        let root = json!({"id": "1", "name": "Tom", "gender": 1});
        assert!(extract_records(&root).is_err());
    }

    #[test]
    fn non_object_element_is_a_shape_error() {
        let root = json!([42]);
        assert!(extract_records(&root).is_err());
    }

    #[test]
    fn scalar_root_is_a_shape_error() {
        assert!(extract_records(&json!(7)).is_err());
    }

    #[test]
    fn max_id_of_empty_set_is_none() {
        assert_eq!(extract_max_id(&json!([])), None);
    }

    #[test]
    fn max_id_of_singleton() {
        let root = json!([{"id": 5, "name": "Tom", "gender": 1}]);
        assert_eq!(extract_max_id(&root), Some(5));
    }

    #[test]
    fn max_id_is_the_last_visited_not_the_largest() {
        // The server sorts descending; the walk trusts it and takes the
        // last element, so an ascending pair yields the smaller id.
        let root = json!([
            {"id": 9, "name": "A", "gender": 1},
            {"id": 3, "name": "B", "gender": 2},
        ]);
        assert_eq!(extract_max_id(&root), Some(3));
    }

    #[test]
    fn max_id_of_non_array_is_none() {
        assert_eq!(extract_max_id(&json!({"id": 5})), None);
    }

    #[test]
    fn node_kinds_classify_every_value() {
        assert_eq!(NodeKind::of(&json!(null)), NodeKind::Null);
        assert_eq!(NodeKind::of(&json!(false)), NodeKind::False);
        assert_eq!(NodeKind::of(&json!(true)), NodeKind::True);
        assert_eq!(NodeKind::of(&json!(1.5)), NodeKind::Number);
        assert_eq!(NodeKind::of(&json!("x")), NodeKind::String);
        assert_eq!(NodeKind::of(&json!([])), NodeKind::Array);
        assert_eq!(NodeKind::of(&json!({})), NodeKind::Object);
    }

    #[test]
    fn walk_reports_names_and_kinds_in_document_order() {
        // Keys are already in sorted order, so the expectation holds with
        // or without serde_json's preserve_order feature.
        let root = json!({
            "id": 1,
            "meta": {"deleted": null},
            "tags": ["a", true]
        });
        let mut seen = Vec::new();
        walk(&root, &mut |entry| {
            seen.push((entry.name.map(str::to_string), entry.kind));
        });
        assert_eq!(
            seen,
            vec![
                (Some("id".to_string()), NodeKind::Number),
                (Some("meta".to_string()), NodeKind::Object),
                (Some("deleted".to_string()), NodeKind::Null),
                (Some("tags".to_string()), NodeKind::Array),
                (None, NodeKind::String),
                (None, NodeKind::True),
            ]
        );
    }

    #[test]
    fn analyze_handles_arbitrary_documents() {
        // Purely a logging walk; it must get through mixed nesting
        // without touching the record shape.
        analyze(&json!({
            "flag": true,
            "items": [1, "two", null, {"deep": [false]}],
            "ratio": 0.5
        }));
    }

    #[test]
    fn walk_over_array_root_visits_elements() {
        let root = json!([{"id": 1}, {"id": 2}]);
        let mut kinds = Vec::new();
        walk(&root, &mut |entry| kinds.push(entry.kind));
        assert_eq!(
            kinds,
            vec![NodeKind::Object, NodeKind::Number, NodeKind::Object, NodeKind::Number]
        );
    }
}
