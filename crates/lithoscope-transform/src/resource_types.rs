//! Resource-type detection for harvested records.
//!
//! INSPIRE records may carry several `document_type` entries; a fixed
//! priority ranking picks one, which is then mapped to our closed enum.
//! "Preprint" never occurs as an input type: an article that does not pass
//! the published heuristic is downgraded to it.

use serde_json::Value;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Article,
    Book,
    BookChapter,
    ConferencePaper,
    Note,
    Other,
    Preprint,
    Proceedings,
    Report,
    Thesis,
}

impl ResourceType {
    /// Repository-native resource type id.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Article => "publication-article",
            ResourceType::Book => "publication-book",
            ResourceType::BookChapter => "publication-section",
            ResourceType::ConferencePaper => "publication-conferencepaper",
            ResourceType::Note => "publication-technicalnote",
            ResourceType::Other => "other",
            ResourceType::Preprint => "publication-preprint",
            ResourceType::Proceedings => "publication-conferenceproceedings",
            ResourceType::Report => "publication-report",
            ResourceType::Thesis => "publication-dissertation",
        }
    }
}

/// INSPIRE document type -> resource type. "activity report" folds into
/// Report; "preprint" is derived, never mapped.
const DOCUMENT_TYPE_MAPPING: &[(&str, ResourceType)] = &[
    ("article", ResourceType::Article),
    ("book", ResourceType::Book),
    ("report", ResourceType::Report),
    ("proceedings", ResourceType::Proceedings),
    ("book chapter", ResourceType::BookChapter),
    ("thesis", ResourceType::Thesis),
    ("note", ResourceType::Note),
    ("conference paper", ResourceType::ConferencePaper),
    ("activity report", ResourceType::Report),
];

/// When a record carries several document types, the earliest entry here
/// wins. Unknown types sink below every known one.
const SELECTION_PRIORITY: &[&str] = &[
    "thesis",
    "conference paper",
    "article",
    "book chapter",
    "book",
    "proceedings",
    "report",
    "activity report",
    "note",
];

pub struct ResourceTypeDetector {
    inspire_id: String,
}

impl ResourceTypeDetector {
    pub fn new(inspire_id: impl Into<String>) -> Self {
        Self { inspire_id: inspire_id.into() }
    }

    fn select_document_type<'a>(&self, doc_types: &[&'a str]) -> &'a str {
        let rank = |v: &str| {
            SELECTION_PRIORITY
                .iter()
                .position(|p| *p == v)
                .unwrap_or(usize::MAX)
        };
        doc_types
            .iter()
            .copied()
            .min_by_key(|v| rank(v))
            .expect("non-empty document type list")
    }

    /// Published-article heuristic, mirroring the INSPIRE literature reader:
    /// citeable (journal title+volume somewhere, page or article id somewhere)
    /// or submitted (a DOI plus a journal title).
    fn is_published_article(&self, src_metadata: &Value) -> bool {
        let empty = Vec::new();
        let pub_info = src_metadata
            .get("publication_info")
            .and_then(Value::as_array)
            .unwrap_or(&empty);

        let has_pub_info = pub_info
            .iter()
            .any(|item| item.get("journal_title").is_some() && item.get("journal_volume").is_some());
        let has_page_or_artid = pub_info
            .iter()
            .any(|item| item.get("page_start").is_some() || item.get("artid").is_some());
        let citeable = has_pub_info && has_page_or_artid;

        let submitted = src_metadata.get("dois").is_some()
            && pub_info.iter().any(|item| item.get("journal_title").is_some());

        citeable || submitted
    }

    /// Returns the detected type (if any) plus accumulated errors. Errors
    /// never panic the pipeline; a `None` type simply leaves the field out.
    pub fn detect(&self, src_metadata: &Value) -> (Option<ResourceType>, Vec<String>) {
        let mut errors = Vec::new();
        let document_types: Vec<&str> = src_metadata
            .get("document_type")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        debug!(inspire_id = %self.inspire_id, ?document_types, "processing document types");

        if document_types.is_empty() {
            errors.push(format!("No document_type found in INSPIRE#{}.", self.inspire_id));
            return (None, errors);
        }

        let document_type = if document_types.len() > 1 {
            let selected = self.select_document_type(&document_types);
            info!(
                inspire_id = %self.inspire_id,
                ?document_types,
                selected,
                "multiple document types, selected by priority"
            );
            selected
        } else {
            document_types[0]
        };

        let mut rt = DOCUMENT_TYPE_MAPPING
            .iter()
            .find(|(raw, _)| *raw == document_type)
            .map(|(_, rt)| *rt);

        if rt.is_none() {
            let available: Vec<&str> = DOCUMENT_TYPE_MAPPING.iter().map(|(raw, _)| *raw).collect();
            errors.push(format!(
                "Error: Couldn't find resource type mapping rule for document_type \
                 '{document_type}'. INSPIRE#{}. Available mappings: {available:?}",
                self.inspire_id
            ));
            warn!(inspire_id = %self.inspire_id, document_type, "unmapped document type");
        }

        if document_type == "article" && !self.is_published_article(src_metadata) {
            rt = Some(ResourceType::Preprint);
        }

        (rt, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detect(metadata: Value) -> (Option<ResourceType>, Vec<String>) {
        ResourceTypeDetector::new("100").detect(&metadata)
    }

    #[test]
    fn test_empty_document_type_errors() {
        let (rt, errors) = detect(json!({"document_type": []}));
        assert!(rt.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_thesis_beats_article_regardless_of_order() {
        for types in [json!(["article", "thesis"]), json!(["thesis", "article"])] {
            let (rt, errors) = detect(json!({"document_type": types}));
            assert_eq!(rt, Some(ResourceType::Thesis));
            assert!(errors.is_empty());
        }
    }

    #[test]
    fn test_unknown_type_sinks_below_known() {
        let (rt, _) = detect(json!({"document_type": ["frobnicator", "note"]}));
        assert_eq!(rt, Some(ResourceType::Note));
    }

    #[test]
    fn test_unmapped_type_reports_available_keys() {
        let (rt, errors) = detect(json!({"document_type": ["frobnicator"]}));
        assert!(rt.is_none());
        assert!(errors[0].contains("Available mappings"));
    }

    #[test]
    fn test_uncited_article_becomes_preprint() {
        let (rt, _) = detect(json!({"document_type": ["article"]}));
        assert_eq!(rt, Some(ResourceType::Preprint));
    }

    #[test]
    fn test_citeable_article_stays_article() {
        let (rt, _) = detect(json!({
            "document_type": ["article"],
            "publication_info": [
                {"journal_title": "PRL", "journal_volume": "19", "page_start": "1264"}
            ]
        }));
        assert_eq!(rt, Some(ResourceType::Article));
    }

    #[test]
    fn test_submitted_article_with_doi_stays_article() {
        let (rt, _) = detect(json!({
            "document_type": ["article"],
            "dois": [{"value": "10.1000/x"}],
            "publication_info": [{"journal_title": "PRL"}]
        }));
        assert_eq!(rt, Some(ResourceType::Article));
    }

    #[test]
    fn test_activity_report_maps_to_report() {
        let (rt, _) = detect(json!({"document_type": ["activity report"]}));
        assert_eq!(rt, Some(ResourceType::Report));
    }
}
