//! Mappers for core descriptive metadata.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use lithoscope_common::config::HarvestConfig;
use lithoscope_common::edtf::EdtfDate;

use crate::context::SerializationContext;
use crate::lang::alpha2_to_alpha3;
use crate::mapper::Mapper;

fn titles(src_metadata: &Value) -> &[Value] {
    src_metadata
        .get("titles")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub struct ResourceTypeMapper;

#[async_trait]
impl Mapper for ResourceTypeMapper {
    fn id(&self) -> &'static str {
        "metadata.resource_type.id"
    }

    async fn map_value(
        &self,
        _src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        ctx.resource_type.map(|rt| Value::String(rt.as_str().to_string()))
    }
}

pub struct TitleMapper;

#[async_trait]
impl Mapper for TitleMapper {
    fn id(&self) -> &'static str {
        "metadata.title"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        _ctx: &mut SerializationContext,
    ) -> Option<Value> {
        titles(src_metadata).first()?.get("title").cloned()
    }
}

/// Titles past the first become alternative titles; every subtitle becomes
/// a subtitle entry. Exact-duplicate text is emitted only once.
pub struct AdditionalTitlesMapper;

#[async_trait]
impl Mapper for AdditionalTitlesMapper {
    fn id(&self) -> &'static str {
        "metadata.additional_titles"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        _ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let all = titles(src_metadata);
        let mut out: Vec<Value> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        let mut push = |text: &str, type_id: &str, out: &mut Vec<Value>, seen: &mut Vec<String>| {
            if text.is_empty() || seen.iter().any(|s| s == text) {
                return;
            }
            seen.push(text.to_string());
            out.push(json!({"title": text, "type": {"id": type_id}}));
        };

        for (i, entry) in all.iter().enumerate() {
            if i > 0 {
                if let Some(title) = entry.get("title").and_then(Value::as_str) {
                    push(title, "alternative-title", &mut out, &mut seen);
                }
            }
            if let Some(subtitle) = entry.get("subtitle").and_then(Value::as_str) {
                push(subtitle, "subtitle", &mut out, &mut seen);
            }
        }

        Some(Value::Array(out))
    }
}

/// Publisher from the first imprint; a record carrying one of our own DOIs
/// but no publisher defaults to the issuing organization.
pub struct PublisherMapper {
    pub config: Arc<HarvestConfig>,
}

#[async_trait]
impl Mapper for PublisherMapper {
    fn id(&self) -> &'static str {
        "metadata.publisher"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let imprints = src_metadata.get("imprints").and_then(Value::as_array);
        if imprints.map(Vec::len).unwrap_or(0) > 1 {
            ctx.error(format!("More than 1 imprint found. INSPIRE#{}.", ctx.inspire_id));
        }

        let publisher = imprints
            .and_then(|i| i.first())
            .and_then(|i| i.get("publisher"))
            .and_then(Value::as_str);

        let has_internal_doi = src_metadata
            .get("dois")
            .and_then(Value::as_array)
            .map(|dois| {
                dois.iter()
                    .filter_map(|d| d.get("value").and_then(Value::as_str))
                    .any(|v| self.config.is_internal_doi(v))
            })
            .unwrap_or(false);

        match publisher {
            Some(p) => Some(Value::String(p.to_string())),
            None if has_internal_doi => Some(Value::String("CERN".to_string())),
            None => None,
        }
    }
}

/// Publication year from publication_info, falling back to the imprint
/// date, falling back to the record creation timestamp.
pub struct PublicationDateMapper;

#[async_trait]
impl Mapper for PublicationDateMapper {
    fn id(&self) -> &'static str {
        "metadata.publication_date"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let publication_year = src_metadata
            .get("publication_info")
            .and_then(Value::as_array)
            .and_then(|p| p.first())
            .and_then(|p| p.get("year"))
            .map(|y| match y {
                Value::Number(n) => n.to_string(),
                other => other.as_str().unwrap_or_default().to_string(),
            })
            .filter(|s| !s.is_empty());

        let imprint_date = src_metadata
            .get("imprints")
            .and_then(Value::as_array)
            .and_then(|i| i.first())
            .and_then(|i| i.get("date"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let created = src_record
            .get("created")
            .or_else(|| src_metadata.get("created"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let date = publication_year.or(imprint_date).or(created)?;
        match EdtfDate::parse_lenient(&date) {
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

/// "© {holder} {year}, {statement} {url}"; holder+year and statement+url
/// are joined independently; entries join with a line break.
pub struct CopyrightMapper;

#[async_trait]
impl Mapper for CopyrightMapper {
    fn id(&self) -> &'static str {
        "metadata.copyright"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        _ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let copyrights = src_metadata.get("copyright").and_then(Value::as_array)?;
        let mut result_list: Vec<String> = Vec::new();

        for cp in copyrights {
            let field = |key: &str| {
                cp.get(key)
                    .map(|v| match v {
                        Value::Number(n) => n.to_string(),
                        other => other.as_str().unwrap_or_default().to_string(),
                    })
                    .unwrap_or_default()
            };
            let holder = field("holder");
            let statement = field("statement");
            let url = field("url");
            let year = field("year");

            if holder.is_empty() && statement.is_empty() && url.is_empty() && year.is_empty() {
                continue;
            }

            let mut parts = Vec::new();
            if !holder.is_empty() || !year.is_empty() {
                let holder_year: Vec<&str> = [holder.as_str(), year.as_str()]
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect();
                parts.push(holder_year.join(" "));
            }
            if !statement.is_empty() || !url.is_empty() {
                let statement_url: Vec<&str> = [statement.as_str(), url.as_str()]
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect();
                parts.push(statement_url.join(" "));
            }
            result_list.push(format!("© {}", parts.join(", ")));
        }

        if result_list.is_empty() {
            None
        } else {
            Some(Value::String(result_list.join("<br />")))
        }
    }
}

pub struct DescriptionMapper;

#[async_trait]
impl Mapper for DescriptionMapper {
    fn id(&self) -> &'static str {
        "metadata.description"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        _ctx: &mut SerializationContext,
    ) -> Option<Value> {
        src_metadata
            .get("abstracts")
            .and_then(Value::as_array)
            .and_then(|a| a.first())
            .and_then(|a| a.get("value"))
            .cloned()
    }
}

/// Abstracts past the first, plus book series title/volume entries.
pub struct AdditionalDescriptionsMapper;

#[async_trait]
impl Mapper for AdditionalDescriptionsMapper {
    fn id(&self) -> &'static str {
        "metadata.additional_descriptions"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        _ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let mut out: Vec<Value> = Vec::new();

        if let Some(abstracts) = src_metadata.get("abstracts").and_then(Value::as_array) {
            for item in abstracts.iter().skip(1) {
                if let Some(value) = item.get("value") {
                    out.push(json!({"description": value, "type": {"id": "abstract"}}));
                }
            }
        }

        if let Some(series) = src_metadata.get("book_series").and_then(Value::as_array) {
            for book in series {
                if let Some(title) = book.get("title") {
                    out.push(json!({"description": title, "type": {"id": "series-information"}}));
                }
                if let Some(volume) = book.get("volume") {
                    out.push(json!({"description": volume, "type": {"id": "series-information"}}));
                }
            }
        }

        Some(Value::Array(out))
    }
}

pub struct SubjectsMapper;

#[async_trait]
impl Mapper for SubjectsMapper {
    fn id(&self) -> &'static str {
        "metadata.subjects"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        _ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let keywords = src_metadata.get("keywords").and_then(Value::as_array)?;
        let subjects: Vec<Value> = keywords
            .iter()
            .filter_map(|k| k.get("value").and_then(Value::as_str))
            .map(|v| json!({"subject": v}))
            .collect();
        Some(Value::Array(subjects))
    }
}

pub struct LanguagesMapper;

#[async_trait]
impl Mapper for LanguagesMapper {
    fn id(&self) -> &'static str {
        "metadata.languages"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let languages = src_metadata.get("languages").and_then(Value::as_array)?;
        let mut mapped: Vec<Value> = Vec::new();
        for lang in languages.iter().filter_map(Value::as_str) {
            match alpha2_to_alpha3(lang) {
                Some(alpha3) => mapped.push(json!({"id": alpha3})),
                None => {
                    ctx.error(format!(
                        "Language '{lang}' does not exist. INSPIRE#: {}.",
                        ctx.inspire_id
                    ));
                    return None;
                }
            }
        }
        Some(Value::Array(mapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> SerializationContext {
        SerializationContext::new(None, "42")
    }

    async fn map(mapper: &dyn Mapper, metadata: Value) -> (Option<Value>, SerializationContext) {
        let mut c = ctx();
        let v = mapper.map_value(&metadata, &json!({}), &mut c).await;
        (v, c)
    }

    #[tokio::test]
    async fn test_title_first_entry_canonical() {
        let (v, _) = map(&TitleMapper, json!({"titles": [{"title": "A"}, {"title": "B"}]})).await;
        assert_eq!(v, Some(json!("A")));
    }

    #[tokio::test]
    async fn test_additional_titles_with_subtitles_and_dedupe() {
        let metadata = json!({"titles": [
            {"title": "Main", "subtitle": "Sub"},
            {"title": "Alt"},
            {"title": "Alt"}
        ]});
        let (v, _) = map(&AdditionalTitlesMapper, metadata).await;
        assert_eq!(
            v,
            Some(json!([
                {"title": "Sub", "type": {"id": "subtitle"}},
                {"title": "Alt", "type": {"id": "alternative-title"}}
            ]))
        );
    }

    #[tokio::test]
    async fn test_publisher_defaults_for_internal_doi() {
        let mapper = PublisherMapper { config: Arc::new(HarvestConfig::default()) };
        let (v, _) = map(&mapper, json!({"dois": [{"value": "10.17181/x"}]})).await;
        assert_eq!(v, Some(json!("CERN")));

        let (v, _) = map(&mapper, json!({"dois": [{"value": "10.1000/x"}]})).await;
        assert_eq!(v, None);

        let (v, _) = map(
            &mapper,
            json!({"imprints": [{"publisher": "Springer"}], "dois": [{"value": "10.17181/x"}]}),
        )
        .await;
        assert_eq!(v, Some(json!("Springer")));
    }

    #[tokio::test]
    async fn test_publication_date_fallback_chain() {
        let (v, _) = map(
            &PublicationDateMapper,
            json!({"publication_info": [{"year": 2019}], "imprints": [{"date": "2018-01-01"}]}),
        )
        .await;
        assert_eq!(v, Some(json!("2019")));

        let (v, _) = map(&PublicationDateMapper, json!({"imprints": [{"date": "2018-01-01"}]})).await;
        assert_eq!(v, Some(json!("2018-01-01")));

        let mut c = ctx();
        let v = PublicationDateMapper
            .map_value(&json!({}), &json!({"created": "2017-06-02T10:00:00+00:00"}), &mut c)
            .await;
        assert_eq!(v, Some(json!("2017-06-02")));
    }

    #[tokio::test]
    async fn test_publication_date_unparsable_is_error() {
        let (v, c) = map(&PublicationDateMapper, json!({"imprints": [{"date": "sometime"}]})).await;
        assert_eq!(v, None);
        assert_eq!(c.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_copyright_composition() {
        let metadata = json!({"copyright": [
            {"holder": "CERN", "year": 2020, "statement": "All rights reserved", "url": "https://c"},
            {"statement": "CC-BY-4.0"},
            {}
        ]});
        let (v, _) = map(&CopyrightMapper, metadata).await;
        assert_eq!(
            v,
            Some(json!("© CERN 2020, All rights reserved https://c<br />© CC-BY-4.0"))
        );
    }

    #[tokio::test]
    async fn test_copyright_all_empty_yields_nothing() {
        let (v, _) = map(&CopyrightMapper, json!({"copyright": [{}]})).await;
        assert_eq!(v, None);
    }

    #[tokio::test]
    async fn test_additional_descriptions_books_and_abstracts() {
        let metadata = json!({
            "abstracts": [{"value": "first"}, {"value": "second"}],
            "book_series": [{"title": "LNP", "volume": "42"}]
        });
        let (v, _) = map(&AdditionalDescriptionsMapper, metadata).await;
        assert_eq!(
            v,
            Some(json!([
                {"description": "second", "type": {"id": "abstract"}},
                {"description": "LNP", "type": {"id": "series-information"}},
                {"description": "42", "type": {"id": "series-information"}}
            ]))
        );
    }

    #[tokio::test]
    async fn test_languages_mapping_and_unknown() {
        let (v, _) = map(&LanguagesMapper, json!({"languages": ["en", "fr"]})).await;
        assert_eq!(v, Some(json!([{"id": "eng"}, {"id": "fra"}])));

        let (v, c) = map(&LanguagesMapper, json!({"languages": ["qq"]})).await;
        assert_eq!(v, None);
        assert_eq!(c.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_subjects_from_keywords() {
        let (v, _) = map(&SubjectsMapper, json!({"keywords": [{"value": "QCD"}, {}]})).await;
        assert_eq!(v, Some(json!([{"subject": "QCD"}])));
    }
}
