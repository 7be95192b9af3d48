//! Merge strategies for core metadata fields.

use serde_json::Value;

use lithoscope_common::edtf::EdtfDate;
use lithoscope_common::json::{get_path, set_path};

use crate::engine::{UpdateConflict, UpdateContext, UpdateResult};
use crate::field::FieldUpdate;

/// Replaces the publication date only with a strictly more granular value.
///
/// Granularity ladder: year < year-month < year-month-day. A coarser
/// incoming never downgrades the stored value; a contradiction at known
/// granularity (different year, month, or day) is a conflict, never
/// auto-resolved in incoming's favor.
pub struct PublicationDateUpdate {
    pub conflict_on_year_mismatch: bool,
    pub conflict_on_same_year_mismatch: bool,
}

impl Default for PublicationDateUpdate {
    fn default() -> Self {
        Self {
            conflict_on_year_mismatch: true,
            conflict_on_same_year_mismatch: true,
        }
    }
}

impl FieldUpdate for PublicationDateUpdate {
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
        let cur_v = get_path(current, path).cloned().unwrap_or(Value::Null);

        let cur_s = cur_v.as_str().unwrap_or_default();
        let Ok(cur) = EdtfDate::parse(cur_s) else {
            return UpdateResult::conflicted(
                current,
                UpdateConflict::new(path, "invalid_date", "Current publication date invalid")
                    .with_current(cur_v.clone()),
            );
        };

        let inc_s = inc_v.as_str().unwrap_or_default();
        let Ok(inc) = EdtfDate::parse(inc_s) else {
            return UpdateResult::conflicted(
                current,
                UpdateConflict::new(path, "invalid_date", "Incoming publication date invalid")
                    .with_incoming(inc_v.clone()),
            );
        };

        if cur.year != inc.year {
            if self.conflict_on_year_mismatch {
                return UpdateResult::conflicted(
                    current,
                    UpdateConflict::new(path, "year_mismatch", "Incoming publication date year differs")
                        .with_current(cur_v.clone())
                        .with_incoming(inc_v.clone()),
                );
            }
            return UpdateResult::unchanged(current);
        }

        let contradiction = match (cur.month, inc.month, cur.day, inc.day) {
            (Some(cm), Some(im), _, _) if cm != im => Some("month_mismatch"),
            (_, _, Some(cd), Some(id)) if cd != id => Some("day_mismatch"),
            _ => None,
        };
        if let Some(kind) = contradiction {
            if self.conflict_on_same_year_mismatch {
                return UpdateResult::conflicted(
                    current,
                    UpdateConflict::new(path, kind, "Incoming publication date contradicts current")
                        .with_current(cur_v.clone())
                        .with_incoming(inc_v.clone()),
                );
            }
            return UpdateResult::unchanged(current);
        }

        if inc.granularity() > cur.granularity() {
            let mut updated = current.clone();
            set_path(&mut updated, path, Value::String(inc.to_string()));
            return UpdateResult::updated(
                updated,
                vec![format!("{path}: updated to more accurate value ({cur} -> {inc})")],
            );
        }

        UpdateResult::unchanged(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PATH: &str = "metadata.publication_date";

    fn run(cur: &str, inc: &str) -> UpdateResult {
        let current = json!({"metadata": {"publication_date": cur}});
        let incoming = json!({"metadata": {"publication_date": inc}});
        PublicationDateUpdate::default().update(&current, &incoming, PATH, &UpdateContext::default())
    }

    #[test]
    fn test_more_granular_incoming_updates() {
        let res = run("2020", "2020-05");
        assert_eq!(res.updated["metadata"]["publication_date"], "2020-05");
        assert!(res.conflicts.is_empty());
    }

    #[test]
    fn test_coarser_incoming_never_downgrades() {
        let res = run("2020-05", "2020");
        assert_eq!(res.updated["metadata"]["publication_date"], "2020-05");
        assert!(res.conflicts.is_empty());
        assert!(res.audit.is_empty());
    }

    #[test]
    fn test_same_year_month_contradiction_conflicts() {
        let res = run("2020-05", "2020-06");
        assert_eq!(res.conflicts[0].kind, "month_mismatch");
        assert_eq!(res.updated["metadata"]["publication_date"], "2020-05");
    }

    #[test]
    fn test_day_contradiction_conflicts() {
        let res = run("2020-05-01", "2020-05-02");
        assert_eq!(res.conflicts[0].kind, "day_mismatch");
    }

    #[test]
    fn test_year_mismatch_conflicts() {
        let res = run("2020", "2021");
        assert_eq!(res.conflicts[0].kind, "year_mismatch");
    }

    #[test]
    fn test_identical_dates_are_a_no_op() {
        let res = run("2020-05", "2020-05");
        assert!(res.conflicts.is_empty());
        assert!(res.audit.is_empty());
    }

    #[test]
    fn test_invalid_incoming_conflicts() {
        let res = run("2020", "May 2020");
        assert_eq!(res.conflicts[0].kind, "invalid_date");
    }
}
