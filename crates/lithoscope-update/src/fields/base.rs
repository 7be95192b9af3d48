//! Generic reusable field update strategies.

use serde_json::Value;

use lithoscope_common::json::{deep_fill_missing, get_path, set_path, value_is_empty};

use crate::engine::{UpdateConflict, UpdateContext, UpdateResult};
use crate::field::FieldUpdate;

/// Incoming fully replaces current; absent incoming is a no-op.
pub struct OverwriteFieldUpdate;

impl FieldUpdate for OverwriteFieldUpdate {
    fn update(
        &self,
        current: &Value,
        incoming: &Value,
        path: &str,
        _ctx: &UpdateContext,
    ) -> UpdateResult {
        let Some(inc_v) = get_path(incoming, path) else {
            return UpdateResult::unchanged(current);
        };
        if get_path(current, path) == Some(inc_v) {
            return UpdateResult::unchanged(current);
        }
        let mut updated = current.clone();
        set_path(&mut updated, path, inc_v.clone());
        UpdateResult::updated(updated, vec![format!("{path}: overwritten")])
    }
}

/// Object merge preferring current values. Keys in `keep_incoming_keys`
/// always take the incoming value even when current has one.
pub struct PreferCurrentMergeDictUpdate {
    pub keep_incoming_keys: Vec<String>,
}

impl FieldUpdate for PreferCurrentMergeDictUpdate {
    fn update(
        &self,
        current: &Value,
        incoming: &Value,
        path: &str,
        _ctx: &UpdateContext,
    ) -> UpdateResult {
        let Some(inc_v) = get_path(incoming, path) else {
            return UpdateResult::unchanged(current);
        };
        let Some(cur_v) = get_path(current, path) else {
            let mut updated = current.clone();
            set_path(&mut updated, path, inc_v.clone());
            return UpdateResult::updated(updated, Vec::new());
        };

        let (Some(cur_obj), Some(inc_obj)) = (cur_v.as_object(), inc_v.as_object()) else {
            return UpdateResult::conflicted(
                current,
                UpdateConflict::new(path, "type_mismatch", "Expected objects to merge")
                    .with_current(cur_v.clone())
                    .with_incoming(inc_v.clone()),
            );
        };

        let mut merged = inc_obj.clone();
        for (k, v) in cur_obj {
            if self.keep_incoming_keys.iter().any(|kk| kk == k) {
                continue;
            }
            let absent = merged.get(k).map_or(true, value_is_empty);
            if absent {
                merged.insert(k.clone(), v.clone());
            }
        }

        if merged == *inc_obj && merged == *cur_obj {
            return UpdateResult::unchanged(current);
        }
        let mut updated = current.clone();
        set_path(&mut updated, path, Value::Object(merged));
        UpdateResult::updated(updated, vec![format!("{path}: merged dict")])
    }
}

/// Append-only merge for a list-of-objects field.
///
/// Items are identified by `key_field`; unseen keys append, seen keys are
/// left alone (or enriched with missing sub-fields when `enrich_existing`).
/// Current items are never removed.
pub struct ListOfDictAppendUniqueUpdate {
    pub key_field: String,
    pub enrich_existing: bool,
}

impl ListOfDictAppendUniqueUpdate {
    pub fn new(key_field: &str) -> Self {
        Self { key_field: key_field.to_string(), enrich_existing: false }
    }
}

impl FieldUpdate for ListOfDictAppendUniqueUpdate {
    fn update(
        &self,
        current: &Value,
        incoming: &Value,
        path: &str,
        _ctx: &UpdateContext,
    ) -> UpdateResult {
        let Some(inc_v) = get_path(incoming, path) else {
            return UpdateResult::unchanged(current);
        };
        let empty = Value::Array(Vec::new());
        let cur_v = get_path(current, path).unwrap_or(&empty);

        let (Some(cur_list), Some(inc_list)) = (cur_v.as_array(), inc_v.as_array()) else {
            return UpdateResult::conflicted(
                current,
                UpdateConflict::new(path, "type_mismatch", "Expected lists at path")
                    .with_current(cur_v.clone())
                    .with_incoming(inc_v.clone()),
            );
        };

        let mut updated_list = cur_list.clone();
        let mut audit = Vec::new();

        let key_of = |item: &Value| item.get(&self.key_field).cloned().unwrap_or(Value::Null);

        // First occurrence wins when current carries duplicate keys.
        let mut idx_by_key: Vec<(Value, usize)> = Vec::new();
        for (idx, item) in cur_list.iter().enumerate() {
            let k = key_of(item);
            if !idx_by_key.iter().any(|(ek, _)| *ek == k) {
                idx_by_key.push((k, idx));
            }
        }

        for inc_item in inc_list {
            let k = key_of(inc_item);
            if let Some((_, idx)) = idx_by_key.iter().find(|(ek, _)| *ek == k) {
                if self.enrich_existing {
                    let enriched = deep_fill_missing(&updated_list[*idx], inc_item);
                    if enriched != updated_list[*idx] {
                        updated_list[*idx] = enriched;
                        audit.push(format!("{path}: enriched item {}={k}", self.key_field));
                    }
                }
                continue;
            }
            updated_list.push(inc_item.clone());
            idx_by_key.push((k.clone(), updated_list.len() - 1));
            audit.push(format!("{path}: appended item {}={k}", self.key_field));
        }

        let mut updated = current.clone();
        set_path(&mut updated, path, Value::Array(updated_list));
        UpdateResult { updated, conflicts: Vec::new(), audit }
    }
}
