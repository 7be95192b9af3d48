//! Merge strategies for identifier lists.

use serde_json::Value;

use lithoscope_common::json::{deep_fill_missing, get_path, set_path};

use crate::engine::{UpdateConflict, UpdateContext, UpdateResult};
use crate::field::FieldUpdate;

fn scheme_and_value(item: &Value) -> Option<(String, String)> {
    let scheme = item.get("scheme")?.as_str()?;
    let identifier = item.get("identifier")?.as_str()?;
    if scheme.is_empty() || identifier.is_empty() {
        return None;
    }
    Some((scheme.to_string(), identifier.to_string()))
}

/// Reconciles `metadata.identifiers`, where each scheme is single-valued.
///
/// Same scheme with a different value than current is a conflict; an exact
/// (scheme, value) pair enriches the stored entry with missing sub-fields;
/// new pairs append. Stored schemes missing from incoming are flagged as a
/// warning in the audit trail, never deleted.
pub struct IdentifiersFieldUpdate;

impl FieldUpdate for IdentifiersFieldUpdate {
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

        // Current indexed by scheme, first occurrence wins.
        let mut cur_by_scheme: Vec<(String, String, usize)> = Vec::new();
        let mut cur_pairs: Vec<(String, String)> = Vec::new();

        for (idx, item) in cur_list.iter().enumerate() {
            let Some((scheme, ident)) = scheme_and_value(item) else {
                conflicts.push(
                    UpdateConflict::new(
                        path,
                        "invalid_identifier",
                        "Identifier entry missing 'scheme' or 'identifier'",
                    )
                    .with_current(item.clone()),
                );
                continue;
            };
            cur_pairs.push((scheme.clone(), ident.clone()));
            match cur_by_scheme.iter().find(|(s, ..)| *s == scheme) {
                Some((_, existing, _)) if *existing != ident => {
                    conflicts.push(
                        UpdateConflict::new(
                            path,
                            "duplicate_scheme_in_current",
                            "Current record has multiple different identifiers for the same scheme",
                        )
                        .with_current(item.clone())
                        .with_detail("scheme", Value::String(scheme)),
                    );
                }
                Some(_) => {}
                None => cur_by_scheme.push((scheme, ident, idx)),
            }
        }

        let mut inc_schemes: Vec<String> = Vec::new();

        for inc_item in inc_list {
            let Some((scheme, ident)) = scheme_and_value(inc_item) else {
                conflicts.push(
                    UpdateConflict::new(
                        path,
                        "invalid_identifier",
                        "Incoming identifier missing 'scheme' or 'identifier'",
                    )
                    .with_incoming(inc_item.clone()),
                );
                continue;
            };
            if !inc_schemes.contains(&scheme) {
                inc_schemes.push(scheme.clone());
            }

            if let Some((_, cur_ident, idx)) = cur_by_scheme.iter().find(|(s, ..)| *s == scheme) {
                if *cur_ident != ident {
                    conflicts.push(
                        UpdateConflict::new(
                            path,
                            "scheme_identifier_mismatch",
                            "Incoming identifier differs for the same scheme",
                        )
                        .with_current(cur_list[*idx].clone())
                        .with_incoming(inc_item.clone())
                        .with_detail("scheme", Value::String(scheme.clone()))
                        .with_detail("current_identifier", Value::String(cur_ident.clone()))
                        .with_detail("incoming_identifier", Value::String(ident.clone())),
                    );
                    continue;
                }
                let enriched = deep_fill_missing(&updated_list[*idx], inc_item);
                if enriched != updated_list[*idx] {
                    updated_list[*idx] = enriched;
                    audit.push(format!("{path}: enriched existing identifier ({scheme}, {ident})"));
                }
                continue;
            }

            updated_list.push(inc_item.clone());
            cur_pairs.push((scheme.clone(), ident.clone()));
            audit.push(format!("{path}: appended identifier ({scheme}, {ident})"));
        }

        let mut extra: Vec<&str> = cur_by_scheme
            .iter()
            .filter(|(s, ..)| !inc_schemes.contains(s))
            .map(|(s, ..)| s.as_str())
            .collect();
        extra.sort_unstable();
        if !extra.is_empty() {
            audit.push(format!(
                "WARNING {path}: current has schemes not present in incoming: {extra:?}"
            ));
        }

        let mut updated = current.clone();
        set_path(&mut updated, path, Value::Array(updated_list));
        UpdateResult { updated, conflicts, audit }
    }
}

/// Reconciles `metadata.related_identifiers`, where several entries may
/// legitimately share a scheme. Matching is by (scheme, value) pair only:
/// known pairs enrich, unknown pairs append, nothing is ever deleted. A
/// shrinking incoming list is flagged as a warning.
pub struct RelatedIdentifiersUpdate;

impl FieldUpdate for RelatedIdentifiersUpdate {
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

        let mut index: Vec<((String, String), usize)> = Vec::new();
        for (idx, item) in cur_list.iter().enumerate() {
            let Some(pair) = scheme_and_value(item) else {
                conflicts.push(
                    UpdateConflict::new(
                        path,
                        "invalid_related_identifier",
                        "Current related identifier missing 'scheme' or 'identifier'",
                    )
                    .with_current(item.clone()),
                );
                continue;
            };
            if !index.iter().any(|(p, _)| *p == pair) {
                index.push((pair, idx));
            }
        }

        for inc_item in inc_list {
            let Some(pair) = scheme_and_value(inc_item) else {
                conflicts.push(
                    UpdateConflict::new(
                        path,
                        "invalid_related_identifier",
                        "Incoming related identifier missing 'scheme' or 'identifier'",
                    )
                    .with_incoming(inc_item.clone()),
                );
                continue;
            };

            if let Some((_, idx)) = index.iter().find(|(p, _)| *p == pair) {
                let enriched = deep_fill_missing(&updated_list[*idx], inc_item);
                if enriched != updated_list[*idx] {
                    updated_list[*idx] = enriched;
                    audit.push(format!(
                        "{path}: enriched existing related identifier ({}, {})",
                        pair.0, pair.1
                    ));
                }
            } else {
                updated_list.push(inc_item.clone());
                index.push((pair.clone(), updated_list.len() - 1));
                audit.push(format!(
                    "{path}: appended related identifier ({}, {})",
                    pair.0, pair.1
                ));
            }
        }

        if cur_list.len() > inc_list.len() {
            audit.push(format!(
                "WARNING {path}: current has {} entries, incoming has {}",
                cur_list.len(),
                inc_list.len()
            ));
        }

        let mut updated = current.clone();
        set_path(&mut updated, path, Value::Array(updated_list));
        UpdateResult { updated, conflicts, audit }
    }
}
