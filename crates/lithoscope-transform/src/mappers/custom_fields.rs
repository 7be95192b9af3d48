//! CERN custom field mapping: imprint and accelerator/experiment tags.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use lithoscope_common::idents::normalize_isbn;

use crate::context::SerializationContext;
use crate::mapper::Mapper;
use crate::vocabulary::{search_vocabulary, VocabularyService};

/// Imprint place plus the (single) electronic ISBN.
pub struct ImprintMapper;

#[async_trait]
impl Mapper for ImprintMapper {
    fn id(&self) -> &'static str {
        "custom_fields.imprint:imprint"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let imprint = src_metadata
            .get("imprints")
            .and_then(Value::as_array)
            .and_then(|i| i.first());

        let isbns = src_metadata
            .get("isbns")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut online_isbns: Vec<String> = Vec::new();
        for isbn in &isbns {
            let value = isbn.get("value").and_then(Value::as_str).unwrap_or_default();
            match normalize_isbn(value) {
                None => ctx.error(format!("Invalid ISBN '{value}'.")),
                Some(valid) => {
                    if isbn.get("medium").and_then(Value::as_str) == Some("online") {
                        online_isbns.push(valid);
                    }
                }
            }
        }
        if online_isbns.len() > 1 {
            ctx.error(format!("More than one electronic ISBN found: {online_isbns:?}."));
        }

        let mut out = Map::new();
        if let Some(place) = imprint.and_then(|i| i.get("place")) {
            out.insert("place".to_string(), place.clone());
        }
        if let Some(isbn) = online_isbns.first() {
            out.insert("isbn".to_string(), json!(isbn));
        }
        Some(Value::Object(out))
    }
}

/// Accelerator/experiment free text resolved against the vocabulary
/// service. Only an exact hit count of 1 is accepted; anything else is
/// logged and dropped — never guess among multiple matches.
pub struct CernFieldsMapper {
    pub vocabularies: Arc<dyn VocabularyService>,
}

impl CernFieldsMapper {
    async fn resolve(
        &self,
        term: &str,
        vocab_type: &str,
        ctx: &SerializationContext,
    ) -> Option<Value> {
        debug!(term, vocab_type, "searching vocabulary");
        let result = search_vocabulary(self.vocabularies.as_ref(), term, vocab_type, ctx).await;
        if result.total == 1 {
            info!(term, vocab_type, "vocabulary term resolved");
            let id = result.hits.first()?.get("id")?.clone();
            Some(json!({"id": id}))
        } else {
            warn!(
                inspire_id = %ctx.inspire_id,
                term,
                vocab_type,
                total = result.total,
                "vocabulary term not uniquely resolved, dropping"
            );
            None
        }
    }
}

#[async_trait]
impl Mapper for CernFieldsMapper {
    fn id(&self) -> &'static str {
        "custom_fields"
    }

    fn returns_patch(&self) -> bool {
        true
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let acc_exp_list = src_metadata
            .get("accelerator_experiments")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut accelerators: Vec<Value> = Vec::new();
        let mut experiments: Vec<Value> = Vec::new();

        for item in &acc_exp_list {
            if let Some(accelerator) = item.get("accelerator").and_then(Value::as_str) {
                let institution = item.get("institution").and_then(Value::as_str).unwrap_or("");
                let term = if institution.is_empty() {
                    accelerator.to_string()
                } else {
                    format!("{institution} {accelerator}")
                };
                if let Some(hit) = self.resolve(&term, "accelerators", ctx).await {
                    accelerators.push(hit);
                }
            }

            if let Some(experiment) = item.get("experiment").and_then(Value::as_str) {
                if let Some(hit) = self.resolve(experiment, "experiments", ctx).await {
                    experiments.push(hit);
                }
            }
        }

        Some(json!({
            "custom_fields": {
                "cern:accelerators": accelerators,
                "cern:experiments": experiments,
            }
        }))
    }
}
