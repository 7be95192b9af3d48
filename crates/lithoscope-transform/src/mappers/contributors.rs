//! Creator/contributor mapping.
//!
//! Role-based split: authors with no role or an author/editor role are
//! creators; all other roles (supervisor etc.) are contributors. Corporate
//! authors become organizational creator entries.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::context::SerializationContext;
use crate::mapper::Mapper;

const CREATOR_ROLES: &[&str] = &["author", "editor"];

/// Schemes kept on person identifiers; anything else is treated as noise
/// and silently dropped.
const AUTHOR_ID_SCHEMES: &[(&str, &str)] = &[("INSPIRE ID", "inspire_author"), ("ORCID", "orcid")];

fn author_identifiers(author: &Value) -> Vec<Value> {
    author
        .get("ids")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| {
                    let schema = id.get("schema").and_then(Value::as_str)?;
                    let value = id.get("value")?;
                    let scheme = AUTHOR_ID_SCHEMES
                        .iter()
                        .find(|(raw, _)| *raw == schema)
                        .map(|(_, s)| *s)?;
                    Some(json!({"identifier": value, "scheme": scheme}))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn author_affiliations(author: &Value) -> Vec<Value> {
    author
        .get("affiliations")
        .and_then(Value::as_array)
        .map(|affs| {
            affs.iter()
                .filter_map(|a| a.get("value").and_then(Value::as_str))
                .map(|v| json!({"name": v}))
                .collect()
        })
        .unwrap_or_default()
}

fn roles(author: &Value) -> Vec<&str> {
    author
        .get("inspire_roles")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Map one INSPIRE author to a person entry. Prefers explicit given/family
/// names; when the family name is absent, splits the "Last, First" display
/// form on the comma.
fn transform_author(author: &Value, ctx: &mut SerializationContext) -> Option<Value> {
    let mut person = Map::new();
    person.insert("type".to_string(), json!("personal"));

    let mut first_name = author
        .get("first_name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let mut last_name = author
        .get("last_name")
        .and_then(Value::as_str)
        .map(str::to_string);

    if last_name.is_none() {
        let full_name = author.get("full_name").and_then(Value::as_str);
        match full_name.and_then(|f| f.split_once(", ")) {
            Some((last, first)) => {
                last_name = Some(last.to_string());
                if first_name.is_none() {
                    first_name = Some(first.to_string());
                }
            }
            None => {
                ctx.error(format!(
                    "Mapping authors field failed. INSPIRE#{}. Author: {author}.",
                    ctx.inspire_id
                ));
                return None;
            }
        }
    }

    if let Some(first) = &first_name {
        person.insert("given_name".to_string(), json!(first));
    }
    if let Some(last) = &last_name {
        person.insert("family_name".to_string(), json!(last));
    }
    if let (Some(first), Some(last)) = (&first_name, &last_name) {
        person.insert("name".to_string(), json!(format!("{last}, {first}")));
    }

    let identifiers = author_identifiers(author);
    if !identifiers.is_empty() {
        person.insert("identifiers".to_string(), Value::Array(identifiers));
    }

    let mut entry = Map::new();
    entry.insert("person_or_org".to_string(), Value::Object(person));

    let affiliations = author_affiliations(author);
    if !affiliations.is_empty() {
        entry.insert("affiliations".to_string(), Value::Array(affiliations));
    }

    if let Some(role) = roles(author).first() {
        entry.insert("role".to_string(), json!({"id": role}));
    }

    Some(Value::Object(entry))
}

pub struct AuthorsMapper;

#[async_trait]
impl Mapper for AuthorsMapper {
    fn id(&self) -> &'static str {
        "metadata.creators"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let authors = src_metadata
            .get("authors")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut creators: Vec<Value> = Vec::new();
        for author in &authors {
            let author_roles = roles(author);
            let is_creator =
                author_roles.is_empty() || author_roles.iter().any(|r| CREATOR_ROLES.contains(r));
            if is_creator {
                if let Some(entry) = transform_author(author, ctx) {
                    creators.push(entry);
                }
            }
        }

        if let Some(corporate) = src_metadata.get("corporate_author").and_then(Value::as_array) {
            for name in corporate.iter().filter_map(Value::as_str) {
                creators.push(json!({
                    "person_or_org": {"type": "organizational", "name": name}
                }));
            }
        }

        Some(Value::Array(creators))
    }
}

pub struct ContributorsMapper;

#[async_trait]
impl Mapper for ContributorsMapper {
    fn id(&self) -> &'static str {
        "metadata.contributors"
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        _src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let authors = src_metadata
            .get("authors")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut contributors: Vec<Value> = Vec::new();
        for author in &authors {
            if roles(author).iter().any(|r| !CREATOR_ROLES.contains(r)) {
                if let Some(entry) = transform_author(author, ctx) {
                    contributors.push(entry);
                }
            }
        }

        Some(Value::Array(contributors))
    }
}
