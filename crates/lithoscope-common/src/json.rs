//! Dotted-path access and pure deep-merge over `serde_json::Value`.
//!
//! The mapper pipeline produces one nested patch per mapper; the builder
//! folds them with `deep_merge_all`. Merging is order-sensitive only at
//! leaf conflicts (last writer wins per key) and has no hidden state.

use serde_json::{Map, Value};

/// Walk a dotted path into a JSON object tree. Returns `None` when any
/// segment is missing or a non-object is hit mid-path.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = doc;
    for part in path.split('.') {
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

/// Set `value` at the dotted path, creating intermediate objects as needed.
/// Intermediate non-object values are replaced by objects.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
    if !doc.is_object() {
        *doc = Value::Object(Map::new());
    }
    let parts: Vec<&str> = path.split('.').collect();
    let mut cur = doc;
    for part in &parts[..parts.len() - 1] {
        let obj = cur.as_object_mut().unwrap();
        let entry = obj
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        cur = entry;
    }
    cur.as_object_mut()
        .unwrap()
        .insert(parts[parts.len() - 1].to_string(), value);
}

/// Build a single-key nested object from a dotted path.
pub fn build_path(path: &str, value: Value) -> Value {
    let mut out = Value::Object(Map::new());
    set_path(&mut out, path, value);
    out
}

/// Merge `b` into `a` non-destructively and return the merged tree.
/// Objects merge recursively; every other type is replaced by `b`.
pub fn deep_merge(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(ao), Value::Object(bo)) => {
            let mut out = ao.clone();
            for (k, v) in bo {
                match out.get(k) {
                    Some(existing) if existing.is_object() && v.is_object() => {
                        let merged = deep_merge(existing, v);
                        out.insert(k.clone(), merged);
                    }
                    _ => {
                        out.insert(k.clone(), v.clone());
                    }
                }
            }
            Value::Object(out)
        }
        _ => b.clone(),
    }
}

/// Fold a sequence of optional patches into one document.
pub fn deep_merge_all<I>(parts: I) -> Value
where
    I: IntoIterator<Item = Option<Value>>,
{
    let mut out = Value::Object(Map::new());
    for part in parts.into_iter().flatten() {
        out = deep_merge(&out, &part);
    }
    out
}

/// Mirrors the "empty" notion used throughout merging: null, "", [], {}.
pub fn value_is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Fill missing/empty keys in `base` from `inc`, recursing into objects.
/// Existing non-empty values in `base` are never touched.
pub fn deep_fill_missing(base: &Value, inc: &Value) -> Value {
    let (Some(base_obj), Some(inc_obj)) = (base.as_object(), inc.as_object()) else {
        return base.clone();
    };
    let mut out = base_obj.clone();
    for (k, v) in inc_obj {
        match out.get(k) {
            None => {
                out.insert(k.clone(), v.clone());
            }
            Some(existing) if value_is_empty(existing) => {
                out.insert(k.clone(), v.clone());
            }
            Some(existing) if existing.is_object() && v.is_object() => {
                let filled = deep_fill_missing(existing, v);
                out.insert(k.clone(), filled);
            }
            Some(_) => {}
        }
    }
    Value::Object(out)
}
