//! Harvester configuration.
//!
//! Every table the transform and write stages consult lives here so the
//! pipeline components stay free of ambient globals. Defaults match the
//! production CDS setup; a TOML file can override any field.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Base URL of the INSPIRE literature search API.
    pub inspire_api_url: String,
    /// OAI set restricting the harvest to records flagged for CDS.
    pub oai_set: String,
    /// Document type restriction applied to every INSPIRE query.
    pub inspire_document_type: String,
    /// DOI prefix of DOIs minted by our own DataCite account.
    pub datacite_prefix: String,
    /// Community every harvested record is filed under.
    pub community_id: String,
    /// Numeric id of the system actor that owns harvested records.
    pub system_user_id: String,
    /// Identifier schemes accepted into `metadata.identifiers`.
    pub identifier_schemes: Vec<String>,
    /// Identifier schemes accepted into `metadata.related_identifiers`.
    pub related_identifier_schemes: Vec<String>,
    /// INSPIRE scheme name -> our scheme name folding.
    pub scheme_mapping: HashMap<String, String>,
    /// Identifier schemes dropped from the source record before mapping.
    pub schemes_to_drop: Vec<String>,
    /// The one file origin allowed to ship documents without a checksum.
    pub checksum_exempt_host: String,
    /// Related-identifier schemes usable for existing-record matching.
    pub alternate_match_schemes: Vec<String>,
    /// File fetch retry budget.
    pub file_fetch_max_retries: u32,
    /// Fixed delay between file fetch attempts, in seconds.
    pub file_fetch_backoff_secs: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            inspire_api_url: "https://inspirehep.net/api/literature".to_string(),
            oai_set: "ForCDS".to_string(),
            inspire_document_type: "thesis".to_string(),
            datacite_prefix: "10.17181".to_string(),
            community_id: "cern-scientific-community".to_string(),
            system_user_id: "system".to_string(),
            identifier_schemes: vec!["cds".to_string(), "inspire".to_string()],
            related_identifier_schemes: vec![
                "doi".to_string(),
                "arxiv".to_string(),
                "isbn".to_string(),
                "handle".to_string(),
                "url".to_string(),
                "urn".to_string(),
                "inspire".to_string(),
            ],
            scheme_mapping: HashMap::from([("hdl".to_string(), "handle".to_string())]),
            schemes_to_drop: vec![
                "SPIRES".to_string(),
                "HAL".to_string(),
                "OSTI".to_string(),
                "SLAC".to_string(),
                "PROQUEST".to_string(),
            ],
            checksum_exempt_host: "arxiv.org".to_string(),
            alternate_match_schemes: vec!["arxiv".to_string()],
            file_fetch_max_retries: 3,
            file_fetch_backoff_secs: 60,
        }
    }
}

impl HarvestConfig {
    /// Load from a TOML file, falling back to defaults for absent keys.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| HarvestError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&raw).map_err(|e| HarvestError::Config(e.to_string()))
    }

    /// True if the DOI was minted under our own DataCite prefix.
    pub fn is_internal_doi(&self, doi: &str) -> bool {
        doi.starts_with(&self.datacite_prefix)
    }

    /// True if files from this URL may omit a content checksum.
    pub fn is_checksum_exempt(&self, url: &str) -> bool {
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.ends_with(&self.checksum_exempt_host)))
            .unwrap_or(false)
    }
}
