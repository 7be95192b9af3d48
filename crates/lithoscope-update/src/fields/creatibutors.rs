//! Merge strategy for creators and contributors.

use serde_json::{Map, Value};

use lithoscope_common::json::{get_path, set_path, value_is_empty};

use crate::engine::{UpdateConflict, UpdateContext, UpdateResult};
use crate::field::FieldUpdate;

/// How one person entry is matched against the stored list: the first
/// complete (scheme, identifier) pair wins, otherwise a normalized name
/// tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PersonKey {
    Id(String, String),
    Name(String, String, String),
}

impl std::fmt::Display for PersonKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersonKey::Id(scheme, id) => write!(f, "{scheme}:{id}"),
            PersonKey::Name(family, given, name) => {
                let display = if !family.is_empty() || !given.is_empty() {
                    format!("{family}, {given}")
                } else {
                    name.clone()
                };
                write!(f, "{display}")
            }
        }
    }
}

fn person_key(entry: &Value) -> PersonKey {
    let person = entry.get("person_or_org");
    let ids = person
        .and_then(|p| p.get("identifiers"))
        .and_then(Value::as_array);
    if let Some(ids) = ids {
        for id in ids {
            let scheme = id.get("scheme").and_then(Value::as_str).unwrap_or_default();
            let identifier = id.get("identifier").and_then(Value::as_str).unwrap_or_default();
            if !scheme.is_empty() && !identifier.is_empty() {
                return PersonKey::Id(scheme.to_string(), identifier.to_string());
            }
        }
    }
    let field = |name: &str| {
        person
            .and_then(|p| p.get(name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    };
    PersonKey::Name(field("family_name"), field("given_name"), field("name"))
}

/// Merge a list of creator/contributor entries.
///
/// Matched entries deepen: affiliations union by name, person fields fill
/// from current, identifier lists union by (scheme, value). An incoming
/// entry with no stored counterpart is a conflict in strict mode and an
/// append otherwise; several stored counterparts are always a conflict.
pub struct CreatibutorsFieldUpdate {
    pub strict: bool,
}

impl CreatibutorsFieldUpdate {
    fn union_affiliations(cur: Option<&Value>, inc: Option<&Value>) -> Vec<Value> {
        let mut out: Vec<Value> = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        let lists = [cur, inc];
        for list in lists.into_iter().flatten() {
            let Some(items) = list.as_array() else { continue };
            for item in items {
                if !item.is_object() {
                    continue;
                }
                let name = item.get("name").and_then(Value::as_str);
                if let Some(name) = name {
                    if seen.iter().any(|s| s == name) {
                        continue;
                    }
                    seen.push(name.to_string());
                }
                out.push(item.clone());
            }
        }
        out
    }

    fn merge_entry(cur: &Value, inc: &Value) -> Value {
        let mut merged = inc.clone();

        if cur.get("affiliations").is_some() || inc.get("affiliations").is_some() {
            merged["affiliations"] = Value::Array(Self::union_affiliations(
                cur.get("affiliations"),
                inc.get("affiliations"),
            ));
        }

        let empty = Map::new();
        let cur_p = cur
            .get("person_or_org")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let inc_p = inc
            .get("person_or_org")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let mut person = inc_p.clone();

        for (k, v) in cur_p {
            if k == "identifiers" {
                continue;
            }
            if person.get(k).map_or(true, value_is_empty) {
                person.insert(k.clone(), v.clone());
            }
        }

        let pair = |id: &Value| {
            (
                id.get("scheme").cloned().unwrap_or(Value::Null),
                id.get("identifier").cloned().unwrap_or(Value::Null),
            )
        };
        let mut ids: Vec<Value> = person
            .get("identifiers")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let seen: Vec<(Value, Value)> = ids.iter().map(pair).collect();
        if let Some(cur_ids) = cur_p.get("identifiers").and_then(Value::as_array) {
            for id in cur_ids {
                if !seen.contains(&pair(id)) {
                    ids.push(id.clone());
                }
            }
        }
        if !ids.is_empty() {
            person.insert("identifiers".to_string(), Value::Array(ids));
        }

        merged["person_or_org"] = Value::Object(person);
        merged
    }
}

impl FieldUpdate for CreatibutorsFieldUpdate {
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
        let mut conflicts = Vec::new();
        let mut audit = Vec::new();

        let index: Vec<(PersonKey, usize)> = cur_list
            .iter()
            .enumerate()
            .map(|(i, c)| (person_key(c), i))
            .collect();

        for inc in inc_list {
            let key = person_key(inc);
            let matches: Vec<usize> = index
                .iter()
                .filter(|(k, _)| *k == key)
                .map(|(_, i)| *i)
                .collect();

            match matches.as_slice() {
                [] => {
                    if self.strict {
                        conflicts.push(
                            UpdateConflict::new(path, "unknown_creator", "Incoming creator not found")
                                .with_incoming(inc.clone()),
                        );
                    } else {
                        updated_list.push(inc.clone());
                        audit.push(format!("{path}: appended creator {key}"));
                    }
                }
                [idx] => {
                    let merged = Self::merge_entry(&cur_list[*idx], inc);
                    if merged != cur_list[*idx] {
                        updated_list[*idx] = merged;
                        audit.push(format!("{path}: merged creator {key}"));
                    }
                }
                _ => {
                    conflicts.push(
                        UpdateConflict::new(path, "ambiguous_match", "Multiple creators match incoming")
                            .with_incoming(inc.clone()),
                    );
                }
            }
        }

        let mut updated = current.clone();
        set_path(&mut updated, path, Value::Array(updated_list));
        UpdateResult { updated, conflicts, audit }
    }
}
