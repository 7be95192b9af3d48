//! Paginated reader for the INSPIRE literature API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use lithoscope_common::config::HarvestConfig;
use lithoscope_common::{HarvestError, Result};

/// Which slice of the upstream corpus one run covers. Selections are
/// mutually exclusive in strict precedence: id, exact date, closed range,
/// open range.
#[derive(Debug, Clone, Default)]
pub struct HarvestSelection {
    pub since: Option<String>,
    pub until: Option<String>,
    pub on_date: Option<String>,
    pub inspire_id: Option<String>,
}

pub struct InspireReader {
    client: reqwest::Client,
    config: Arc<HarvestConfig>,
}

impl InspireReader {
    pub fn new(config: Arc<HarvestConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, config })
    }

    fn build_query(&self, selection: &HarvestSelection) -> String {
        let base = format!(
            "_oai.sets:{} AND document_type:{}",
            self.config.oai_set, self.config.inspire_document_type
        );
        if let Some(id) = &selection.inspire_id {
            format!("{base} AND id:{id}")
        } else if let Some(on_date) = &selection.on_date {
            format!("{base} AND du:{on_date}")
        } else if let (Some(since), Some(until)) = (&selection.since, &selection.until) {
            format!("{base} AND du >= {since} AND du <= {until}")
        } else if let Some(since) = &selection.since {
            format!("{base} AND du >= {since}")
        } else {
            base
        }
    }

    /// Fetch every record the selection covers, following opaque `next`
    /// links until exhaustion.
    #[instrument(skip_all)]
    pub async fn read(&self, selection: &HarvestSelection) -> Result<Vec<Value>> {
        let query = self.build_query(selection);
        info!(%query, "querying INSPIRE");

        let mut url = reqwest::Url::parse_with_params(
            &self.config.inspire_api_url,
            [("q", query.as_str())],
        )
        .map_err(|e| HarvestError::Reader(format!("invalid API url: {e}")))?
        .to_string();

        let mut records = Vec::new();
        loop {
            debug!(%url, "fetching page");
            let response = self
                .client
                .get(&url)
                .header("Accept", "application/json")
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(HarvestError::Reader(format!(
                    "INSPIRE query failed with status {status} for {url}: {body}"
                )));
            }
            let page: Value = response.json().await?;

            let total = page
                .pointer("/hits/total")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            if total == 0 {
                warn!(%url, "no results found");
            }
            if let Some(hits) = page.pointer("/hits/hits").and_then(Value::as_array) {
                records.extend(hits.iter().cloned());
            }

            match page.pointer("/links/next").and_then(Value::as_str) {
                Some(next) => url = next.to_string(),
                None => break,
            }
        }

        info!(n = records.len(), "finished reading");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> InspireReader {
        InspireReader::new(Arc::new(HarvestConfig::default())).unwrap()
    }

    #[test]
    fn test_query_precedence_id_over_dates() {
        let sel = HarvestSelection {
            inspire_id: Some("2851521".to_string()),
            since: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            reader().build_query(&sel),
            "_oai.sets:ForCDS AND document_type:thesis AND id:2851521"
        );
    }

    #[test]
    fn test_query_exact_date() {
        let sel = HarvestSelection {
            on_date: Some("2024-05-01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            reader().build_query(&sel),
            "_oai.sets:ForCDS AND document_type:thesis AND du:2024-05-01"
        );
    }

    #[test]
    fn test_query_closed_and_open_ranges() {
        let closed = HarvestSelection {
            since: Some("2024-01-01".to_string()),
            until: Some("2024-02-01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            reader().build_query(&closed),
            "_oai.sets:ForCDS AND document_type:thesis AND du >= 2024-01-01 AND du <= 2024-02-01"
        );

        let open = HarvestSelection {
            since: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            reader().build_query(&open),
            "_oai.sets:ForCDS AND document_type:thesis AND du >= 2024-01-01"
        );
    }
}
