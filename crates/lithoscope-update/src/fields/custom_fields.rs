//! Merge strategy for the thesis custom field.

use serde_json::Value;

use lithoscope_common::json::{get_path, set_path, value_is_empty};

use crate::engine::{UpdateConflict, UpdateContext, UpdateResult};
use crate::field::FieldUpdate;

/// Only a fixed allow-list of thesis subkeys may be overwritten from
/// incoming; everything else on the stored object (defence and submission
/// dates in particular) is preserved untouched.
pub struct ThesisFieldUpdate {
    pub updatable_keys: Vec<String>,
}

impl Default for ThesisFieldUpdate {
    fn default() -> Self {
        Self {
            updatable_keys: vec!["university".to_string(), "type".to_string()],
        }
    }
}

impl FieldUpdate for ThesisFieldUpdate {
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
            let Some(_) = inc_v.as_object() else {
                return UpdateResult::conflicted(
                    current,
                    UpdateConflict::new(path, "type_mismatch", "Incoming thesis field is not an object")
                        .with_incoming(inc_v.clone()),
                );
            };
            let mut updated = current.clone();
            set_path(&mut updated, path, inc_v.clone());
            return UpdateResult::updated(updated, vec![format!("{path}: set (was missing)")]);
        };

        let (Some(cur_obj), Some(inc_obj)) = (cur_v.as_object(), inc_v.as_object()) else {
            return UpdateResult::conflicted(
                current,
                UpdateConflict::new(path, "type_mismatch", "Expected thesis field to be an object")
                    .with_current(cur_v.clone())
                    .with_incoming(inc_v.clone()),
            );
        };

        let mut merged = cur_obj.clone();
        let mut changed = Vec::new();
        for key in &self.updatable_keys {
            if let Some(v) = inc_obj.get(key) {
                if !value_is_empty(v) && cur_obj.get(key) != Some(v) {
                    merged.insert(key.clone(), v.clone());
                    changed.push(key.as_str());
                }
            }
        }

        let audit = if changed.is_empty() {
            Vec::new()
        } else {
            vec![format!("{path}: updated keys {changed:?}")]
        };

        let mut updated = current.clone();
        set_path(&mut updated, path, Value::Object(merged));
        UpdateResult::updated(updated, audit)
    }
}
