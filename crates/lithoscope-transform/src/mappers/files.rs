//! File mapping.
//!
//! Every INSPIRE document becomes one file entry keyed by filename. A
//! document without a content checksum is only tolerated when it comes from
//! the one checksum-exempt origin; otherwise the whole mapper output is
//! rejected — a data-quality gate, not a per-file skip.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use lithoscope_common::config::HarvestConfig;

use crate::context::SerializationContext;
use crate::mapper::Mapper;

pub struct FilesMapper {
    pub config: Arc<HarvestConfig>,
}

#[async_trait]
impl Mapper for FilesMapper {
    fn id(&self) -> &'static str {
        "files"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let documents = src_metadata
            .get("documents")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        debug!(inspire_id = %ctx.inspire_id, n = documents.len(), "mapping documents");

        let mut entries = Map::new();

        for doc in &documents {
            let Some(filename) = doc.get("filename").and_then(Value::as_str) else {
                ctx.error(format!(
                    "Document without filename. INSPIRE record id: {}.",
                    ctx.inspire_id
                ));
                continue;
            };
            // INSPIRE only exposes pdfs for us
            let key = if filename.contains("pdf") {
                filename.to_string()
            } else {
                format!("{filename}.pdf")
            };

            let url = doc.get("url").and_then(Value::as_str).unwrap_or_default();
            let checksum = doc.get("key").and_then(Value::as_str).unwrap_or_default();

            if checksum.is_empty() && !self.config.is_checksum_exempt(url) {
                ctx.error(format!(
                    "Document '{key}' has no checksum and is not from a trusted origin. \
                     INSPIRE record id: {}. Rejecting all files.",
                    ctx.inspire_id
                ));
                return None;
            }

            let mut details = Map::new();
            if !checksum.is_empty() {
                details.insert("checksum".to_string(), json!(format!("md5:{checksum}")));
            }
            details.insert("key".to_string(), json!(key));
            details.insert("access".to_string(), json!({"hidden": false}));
            details.insert("inspire_url".to_string(), json!(url));

            let mut file_metadata = Map::new();
            if let Some(description) = doc.get("description") {
                file_metadata.insert("description".to_string(), description.clone());
            }
            if let Some(original_url) = doc.get("original_url") {
                file_metadata.insert("original_url".to_string(), original_url.clone());
            }
            if !file_metadata.is_empty() {
                details.insert("metadata".to_string(), Value::Object(file_metadata));
            }

            entries.insert(key, Value::Object(details));
        }

        Some(json!({"enabled": true, "entries": entries}))
    }
}
