//! Edits and lookups on the JSON tree shared by both store implementations.

use serde_json::{Map, Value};

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Value at `path`, treating `null` and "missing" identically.
pub fn subtree<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in split(path) {
        node = node.as_object()?.get(segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}

/// Overwrite the node at `path`, creating intermediate objects as needed.
/// Writing `null` removes the node.
pub fn write(root: &mut Value, path: &str, value: Value) {
    let segments = split(path);
    let Some((last, ancestors)) = segments.split_last() else {
        *root = value;
        return;
    };
    let mut node = root;
    for segment in ancestors {
        node = ensure_object(node)
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    let map = ensure_object(node);
    if value.is_null() {
        map.remove(*last);
    } else {
        map.insert(last.to_string(), value);
    }
}
