//! DOI, identifier and related-identifier mapping.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use lithoscope_common::config::HarvestConfig;
use lithoscope_common::idents::{is_doi, normalize_isbn};

use crate::context::SerializationContext;
use crate::mapper::Mapper;

/// At most one DOI is accepted; two distinct DOIs are ambiguous and the
/// whole field is dropped with an error. Provider is decided by prefix.
pub struct DoiMapper {
    pub config: Arc<HarvestConfig>,
}

#[async_trait]
impl Mapper for DoiMapper {
    fn id(&self) -> &'static str {
        "pids"
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
        let dois = src_metadata.get("dois").and_then(Value::as_array)?;

        let mut seen = HashSet::new();
        let mut unique: Vec<&str> = Vec::new();
        for doi in dois.iter().filter_map(|d| d.get("value").and_then(Value::as_str)) {
            if seen.insert(doi) {
                unique.push(doi);
            }
        }

        match unique.as_slice() {
            [] => None,
            [doi] => {
                if !is_doi(doi) {
                    ctx.error(format!(
                        "DOI validation failed. DOI#{doi}. INSPIRE#{}.",
                        ctx.inspire_id
                    ));
                    return None;
                }
                let provider = if self.config.is_internal_doi(doi) {
                    "datacite"
                } else {
                    "external"
                };
                Some(json!({"pids": {"doi": {"identifier": doi, "provider": provider}}}))
            }
            _ => {
                ctx.error(format!("More than 1 DOI was found in INSPIRE#{}.", ctx.inspire_id));
                None
            }
        }
    }
}

/// `metadata.identifiers` from external system identifiers. The legacy
/// "cdsrdm" scheme folds into "cds"; schemes belonging to the
/// related-identifier table are skipped here.
pub struct IdentifiersMapper {
    pub config: Arc<HarvestConfig>,
}

#[async_trait]
impl Mapper for IdentifiersMapper {
    fn id(&self) -> &'static str {
        "metadata.identifiers"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let external_ids = src_metadata
            .get("external_system_identifiers")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut identifiers: Vec<Value> = Vec::new();
        for ext in &external_ids {
            let Some(schema) = ext.get("schema").and_then(Value::as_str) else { continue };
            let value = ext.get("value").cloned().unwrap_or(Value::Null);
            let mut scheme = schema.to_lowercase();
            if scheme == "cdsrdm" {
                scheme = "cds".to_string();
            }
            if self.config.identifier_schemes.contains(&scheme) {
                identifiers.push(json!({"identifier": value, "scheme": scheme}));
            } else if self.config.related_identifier_schemes.contains(&scheme) {
                continue;
            } else {
                ctx.error(format!(
                    "Unexpected schema found in external_system_identifiers. Schema: {scheme}, \
                     value: {value}. INSPIRE record id: {}.",
                    ctx.inspire_id
                ));
            }
        }

        let mut unique: Vec<Value> = Vec::new();
        for id in identifiers {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Some(Value::Array(unique))
    }
}

/// `metadata.related_identifiers`: persistent identifiers, external system
/// identifiers, ISBNs, arXiv eprints, plus the INSPIRE id itself.
pub struct RelatedIdentifiersMapper {
    pub config: Arc<HarvestConfig>,
}

impl RelatedIdentifiersMapper {
    fn related_entry(&self, scheme: &str, value: Value, resource_type: &str) -> Value {
        let relation = if scheme == "doi" { "isversionof" } else { "isvariantformof" };
        json!({
            "identifier": value,
            "scheme": scheme,
            "relation_type": {"id": relation},
            "resource_type": {"id": resource_type},
        })
    }
}

#[async_trait]
impl Mapper for RelatedIdentifiersMapper {
    fn id(&self) -> &'static str {
        "metadata.related_identifiers"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let mut identifiers: Vec<Value> = Vec::new();

        let persistent = src_metadata
            .get("persistent_identifiers")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for pid in &persistent {
            let Some(schema) = pid.get("schema").and_then(Value::as_str) else { continue };
            let value = pid.get("value").cloned().unwrap_or(Value::Null);
            let mut scheme = schema.to_lowercase();
            if let Some(mapped) = self.config.scheme_mapping.get(&scheme) {
                scheme = mapped.clone();
            }
            if self.config.related_identifier_schemes.contains(&scheme) {
                identifiers.push(self.related_entry(&scheme, value, "publication-other"));
            } else if self.config.identifier_schemes.contains(&scheme) {
                continue;
            } else {
                ctx.error(format!(
                    "Unexpected schema found in persistent_identifiers. Schema: {scheme}, \
                     value: {value}. INSPIRE#: {}.",
                    ctx.inspire_id
                ));
            }
        }

        let external = src_metadata
            .get("external_system_identifiers")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for ext in &external {
            let Some(schema) = ext.get("schema").and_then(Value::as_str) else { continue };
            let value = ext.get("value").cloned().unwrap_or(Value::Null);
            let scheme = schema.to_lowercase();
            if scheme == "cdsrdm" {
                continue;
            }
            if self.config.related_identifier_schemes.contains(&scheme) {
                identifiers.push(self.related_entry(&scheme, value, "publication-other"));
            } else if self.config.identifier_schemes.contains(&scheme) {
                continue;
            } else {
                ctx.error(format!(
                    "Unexpected schema found in external_system_identifiers. Schema: {scheme}, \
                     value: {value}. INSPIRE record id: {}.",
                    ctx.inspire_id
                ));
            }
        }

        let isbns = src_metadata
            .get("isbns")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for isbn in &isbns {
            let value = isbn.get("value").and_then(Value::as_str).unwrap_or_default();
            match normalize_isbn(value) {
                Some(normalized) => {
                    identifiers.push(self.related_entry("isbn", json!(normalized), "publication-book"));
                }
                None => ctx.error(format!("Invalid ISBN '{value}'.")),
            }
        }

        let eprints = src_metadata
            .get("arxiv_eprints")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for eprint in &eprints {
            if let Some(value) = eprint.get("value").and_then(Value::as_str) {
                identifiers.push(self.related_entry(
                    "arxiv",
                    json!(format!("arXiv:{value}")),
                    "publication-other",
                ));
            }
        }

        identifiers.push(self.related_entry(
            "inspire",
            json!(ctx.inspire_id.clone()),
            "publication-other",
        ));

        let mut unique: Vec<Value> = Vec::new();
        for id in identifiers {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Some(Value::Array(unique))
    }
}
