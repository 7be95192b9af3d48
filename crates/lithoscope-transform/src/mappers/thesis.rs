//! Thesis-specific mappers, applied through the policy's add/replace
//! tables for the Thesis resource type.

use async_trait::async_trait;
use serde_json::Value;

use lithoscope_common::edtf::EdtfDate;

use crate::context::SerializationContext;
use crate::mapper::Mapper;

/// Replaces the generic publication date for theses: thesis_info.date,
/// falling back to the imprint date.
pub struct ThesisPublicationDateMapper;

#[async_trait]
impl Mapper for ThesisPublicationDateMapper {
    fn id(&self) -> &'static str {
        "metadata.publication_date"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let imprint_date = src_metadata
            .get("imprints")
            .and_then(Value::as_array)
            .and_then(|i| i.first())
            .and_then(|i| i.get("date"))
            .and_then(Value::as_str);

        let thesis_date = src_metadata
            .get("thesis_info")
            .and_then(|t| t.get("date"))
            .and_then(Value::as_str)
            .or(imprint_date);

        let Some(date) = thesis_date else {
            ctx.error(format!(
                "Thesis publication date transform failed. INSPIRE#{}.",
                ctx.inspire_id
            ));
            return None;
        };

        match EdtfDate::parse_lenient(date) {
            Ok(parsed) => Some(Value::String(parsed.to_string())),
            Err(e) => {
                ctx.error(format!(
                    "Publication date transformation failed. INSPIRE#{}. Date: {date}. Error: {e}.",
                    ctx.inspire_id
                ));
                None
            }
        }
    }
}

pub struct ThesisDefenceDateMapper;

#[async_trait]
impl Mapper for ThesisDefenceDateMapper {
    fn id(&self) -> &'static str {
        "custom_fields.thesis:thesis.defense_date"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        _ctx: &mut SerializationContext,
    ) -> Option<Value> {
        src_metadata
            .get("thesis_info")
            .and_then(|t| t.get("defense_date"))
            .cloned()
    }
}
