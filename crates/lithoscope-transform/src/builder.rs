//! Record assembly: one source record in, one target draft payload out.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use lithoscope_common::config::HarvestConfig;
use lithoscope_common::json::{deep_merge_all, get_path};

use crate::context::SerializationContext;
use crate::policies::{assert_unique_ids, MapperPolicy};
use crate::resource_types::ResourceTypeDetector;

/// Drives one record through detection and the mapper pipeline.
///
/// Building never fails hard on content problems: the outcome is an
/// optional payload plus the list of accumulated mapping errors, and the
/// caller decides what a non-empty error list means for the run.
pub struct RecordBuilder {
    policy: MapperPolicy,
    config: Arc<HarvestConfig>,
}

impl RecordBuilder {
    pub fn new(policy: MapperPolicy, config: Arc<HarvestConfig>) -> Self {
        Self { policy, config }
    }

    /// Transform a source record into a draft payload.
    ///
    /// Records without any attached document are rejected with a single
    /// error before any mapper runs. All other problems accumulate and the
    /// payload is still produced field by field.
    #[instrument(skip_all, fields(inspire_id = %source_id(src_record)))]
    pub async fn build(&self, src_record: &Value) -> (Option<Value>, Vec<String>) {
        let inspire_id = source_id(src_record);
        let src_metadata = src_record.get("metadata").cloned().unwrap_or(Value::Null);

        // No document, no record. The gate sits in front of the pipeline so
        // one missing file does not surface as eighteen mapper errors.
        if !has_documents(&src_metadata) {
            return (
                None,
                vec![format!(
                    "record {inspire_id} has no attached documents, skipping"
                )],
            );
        }

        let src_metadata = self.clean_identifiers(src_metadata);

        let detector = ResourceTypeDetector::new(inspire_id.clone());
        let (resource_type, mut errors) = detector.detect(&src_metadata);

        let mappers = self.policy.build_for(resource_type);
        if let Err(err) = assert_unique_ids(&mappers) {
            errors.push(err.to_string());
            return (None, errors);
        }

        let mut ctx = SerializationContext::new(resource_type, inspire_id.clone());
        let mut patches = Vec::with_capacity(mappers.len());
        for mapper in &mappers {
            patches.push(mapper.apply(&src_metadata, src_record, &mut ctx).await);
        }
        let merged = deep_merge_all(patches);
        errors.extend(ctx.errors);

        let payload = self.assemble(&inspire_id, merged);
        debug!(error_count = errors.len(), "record built");
        (Some(payload), errors)
    }

    /// Drop identifier entries carrying legacy schemes the target repository
    /// does not track. Scheme comparison is case-insensitive.
    fn clean_identifiers(&self, mut metadata: Value) -> Value {
        for field in ["external_system_identifiers", "persistent_identifiers"] {
            let Some(entries) = metadata.get_mut(field).and_then(Value::as_array_mut) else {
                continue;
            };
            entries.retain(|entry| {
                let scheme = entry
                    .get("schema")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_uppercase();
                let drop = self
                    .config
                    .schemes_to_drop
                    .iter()
                    .any(|s| s.to_uppercase() == scheme);
                if drop {
                    warn!(%scheme, "dropping legacy identifier scheme");
                }
                !drop
            });
        }
        metadata
    }

    /// Lift mapper output into the final draft shape. `pids` and `files`
    /// move to the payload top level next to fixed access and ownership
    /// sections.
    fn assemble(&self, inspire_id: &str, merged: Value) -> Value {
        let pids = get_path(&merged, "pids").cloned();
        let files = get_path(&merged, "files").cloned();
        let metadata = get_path(&merged, "metadata").cloned().unwrap_or(json!({}));
        let custom_fields = get_path(&merged, "custom_fields").cloned().unwrap_or(json!({}));

        let mut payload = json!({
            "id": inspire_id,
            "metadata": metadata,
            "custom_fields": custom_fields,
            "parent": {
                "access": {
                    "owned_by": { "user": self.config.system_user_id }
                }
            },
            "access": {
                "record": "public",
                "files": "public",
            },
        });
        if let Some(pids) = pids {
            payload["pids"] = pids;
        }
        if let Some(files) = files {
            payload["files"] = files;
        }
        payload
    }
}

fn source_id(src_record: &Value) -> String {
    match src_record.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn has_documents(src_metadata: &Value) -> bool {
    src_metadata
        .get("documents")
        .and_then(Value::as_array)
        .is_some_and(|docs| !docs.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_mapper_policy;
    use crate::vocabulary::{VocabularySearchResult, VocabularyService};
    use async_trait::async_trait;
    use serde_json::json;

    struct NoVocab;

    #[async_trait]
    impl VocabularyService for NoVocab {
        async fn search(
            &self,
            _term: &str,
            _vocab_type: &str,
        ) -> anyhow::Result<VocabularySearchResult> {
            Ok(VocabularySearchResult::default())
        }
    }

    fn builder() -> RecordBuilder {
        let config = Arc::new(HarvestConfig::default());
        RecordBuilder::new(
            default_mapper_policy(config.clone(), Arc::new(NoVocab)),
            config,
        )
    }

    fn thesis_record() -> Value {
        json!({
            "id": 2851521,
            "created": "2024-11-02T00:00:00+00:00",
            "metadata": {
                "document_type": ["thesis"],
                "titles": [{"title": "A measurement"}],
                "authors": [{"full_name": "Doe, Jane"}],
                "thesis_info": {"date": "2024-06", "defense_date": "2024-07-01"},
                "documents": [{
                    "key": "abc123",
                    "filename": "thesis.pdf",
                    "url": "https://inspirehep.net/files/abc123",
                    "original_url": "https://example.org/thesis.pdf",
                }],
            }
        })
    }

    #[tokio::test]
    async fn test_build_thesis_record() {
        let (payload, errors) = builder().build(&thesis_record()).await;
        let payload = payload.unwrap();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(payload["id"], "2851521");
        assert_eq!(
            payload["metadata"]["resource_type"]["id"],
            "publication-dissertation"
        );
        assert_eq!(payload["metadata"]["publication_date"], "2024-06");
        assert_eq!(
            payload["custom_fields"]["thesis:thesis"]["defense_date"],
            "2024-07-01"
        );
        assert_eq!(payload["access"]["record"], "public");
        assert_eq!(payload["parent"]["access"]["owned_by"]["user"], "system");
        assert!(payload["files"]["entries"]["thesis.pdf"].is_object());
    }

    #[tokio::test]
    async fn test_missing_documents_rejects_before_mapping() {
        let mut record = thesis_record();
        record["metadata"]["documents"] = json!([]);
        let (payload, errors) = builder().build(&record).await;
        assert!(payload.is_none());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("no attached documents"));
    }

    #[tokio::test]
    async fn test_mapping_errors_accumulate_without_aborting() {
        let mut record = thesis_record();
        record["metadata"]["languages"] = json!(["xx"]);
        let (payload, errors) = builder().build(&record).await;
        assert!(payload.is_some());
        assert!(errors.iter().any(|e| e.contains("xx")));
    }

    #[tokio::test]
    async fn test_clean_identifiers_drops_legacy_schemes() {
        let mut record = thesis_record();
        record["metadata"]["external_system_identifiers"] = json!([
            {"schema": "SPIRES", "value": "SPIRES-123"},
            {"schema": "CDSRDM", "value": "z4f6w-e4v34"},
        ]);
        let (payload, _errors) = builder().build(&record).await;
        let payload = payload.unwrap();
        let related = payload["metadata"]["related_identifiers"].as_array().unwrap();
        assert!(!related.iter().any(|r| {
            r["identifier"].as_str().is_some_and(|v| v.contains("SPIRES"))
        }));
    }
}
