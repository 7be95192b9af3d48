//! Existing-record resolution.
//!
//! Before writing, the built record is matched against the store with a
//! prioritized cascade of identifier filters. The first filter yielding
//! any hits decides; hits are never merged across filter types.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use lithoscope_common::config::HarvestConfig;
use lithoscope_common::json::get_path;
use lithoscope_common::Result;

use crate::store::{IdentifierFilter, RecordStore};

/// What the writer should do with one built record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Create,
    Update(String),
    /// More than one stored record matched a single filter. Hard error
    /// upstream; no partial action is ever taken.
    Ambiguous(Vec<String>),
}

pub struct ExistingRecordResolver {
    store: Arc<dyn RecordStore>,
    config: Arc<HarvestConfig>,
}

impl ExistingRecordResolver {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<HarvestConfig>) -> Self {
        Self { store, config }
    }

    /// The cascade, in strict priority order: DOI, canonical pid, legacy
    /// internal identifier, source id, then alternate schemes.
    fn candidate_filters(&self, record: &Value) -> Vec<IdentifierFilter> {
        let mut filters = Vec::new();

        if let Some(doi) = get_path(record, "pids.doi.identifier").and_then(Value::as_str) {
            filters.push(IdentifierFilter::Doi(doi.to_string()));
        }

        let metadata_identifier = |scheme: &str| {
            record
                .get("metadata")
                .and_then(|m| m.get("identifiers"))
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .find(|e| e.get("scheme").and_then(Value::as_str) == Some(scheme))
                .and_then(|e| e.get("identifier"))
                .and_then(Value::as_str)
        };

        if let Some(pid) = metadata_identifier("cds") {
            filters.push(IdentifierFilter::Pid(pid.to_string()));
            filters.push(IdentifierFilter::MetadataIdentifier {
                scheme: "cds".to_string(),
                value: pid.to_string(),
            });
        }

        if let Some(inspire_id) = record.get("id").and_then(Value::as_str) {
            filters.push(IdentifierFilter::RelatedIdentifier {
                scheme: "inspire".to_string(),
                value: inspire_id.to_string(),
            });
        }

        let related = record
            .get("metadata")
            .and_then(|m| m.get("related_identifiers"))
            .and_then(Value::as_array);
        for scheme in &self.config.alternate_match_schemes {
            let Some(entries) = related else { break };
            for entry in entries {
                if entry.get("scheme").and_then(Value::as_str) == Some(scheme.as_str()) {
                    if let Some(value) = entry.get("identifier").and_then(Value::as_str) {
                        filters.push(IdentifierFilter::RelatedIdentifier {
                            scheme: scheme.clone(),
                            value: value.to_string(),
                        });
                    }
                }
            }
        }

        filters
    }

    #[instrument(skip_all, fields(inspire_id = record.get("id").and_then(serde_json::Value::as_str).unwrap_or("")))]
    pub async fn resolve(&self, record: &Value) -> Result<ResolveOutcome> {
        for filter in self.candidate_filters(record) {
            let hits = self.store.search(&filter).await?;
            if hits.total == 0 {
                continue;
            }
            debug!(?filter, total = hits.total, "filter matched");
            return Ok(match hits.ids.as_slice() {
                [id] => ResolveOutcome::Update(id.clone()),
                _ => ResolveOutcome::Ambiguous(hits.ids),
            });
        }
        debug!("no existing record matched");
        Ok(ResolveOutcome::Create)
    }
}
