//! The write path: create, in-place update, or new version.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use lithoscope_common::config::HarvestConfig;
use lithoscope_common::json::get_path;
use lithoscope_common::{HarvestError, Result};
use lithoscope_update::{UpdateConflict, UpdateContext, UpdateEngine};

use crate::fetch::FileFetcher;
use crate::resolver::{ExistingRecordResolver, ResolveOutcome};
use crate::store::{Draft, RecordStore};

/// What the writer did with one entry.
#[derive(Debug)]
pub enum WriteOutcome {
    Created { record_id: String },
    Updated { record_id: String, conflicts: Vec<UpdateConflict> },
}

pub struct RecordWriter {
    store: Arc<dyn RecordStore>,
    fetcher: Arc<dyn FileFetcher>,
    resolver: ExistingRecordResolver,
    engine: UpdateEngine,
    config: Arc<HarvestConfig>,
}

impl RecordWriter {
    pub fn new(
        store: Arc<dyn RecordStore>,
        fetcher: Arc<dyn FileFetcher>,
        engine: UpdateEngine,
        config: Arc<HarvestConfig>,
    ) -> Self {
        let resolver = ExistingRecordResolver::new(store.clone(), config.clone());
        Self { store, fetcher, resolver, engine, config }
    }

    /// Resolve and write one built record. Ambiguous matches are a hard
    /// per-entry error; the caller carries on with the rest of the batch.
    #[instrument(skip_all, fields(inspire_id = entry.get("id").and_then(serde_json::Value::as_str).unwrap_or("")))]
    pub async fn write(&self, entry: &Value) -> Result<WriteOutcome> {
        match self.resolver.resolve(entry).await? {
            ResolveOutcome::Ambiguous(ids) => Err(HarvestError::Writer(format!(
                "multiple existing records match: {}",
                ids.join(", ")
            ))),
            ResolveOutcome::Create => self.create(entry).await,
            ResolveOutcome::Update(record_id) => self.update(entry, &record_id).await,
        }
    }

    // ── Create ─────────────────────────────────────────────────────────

    async fn create(&self, entry: &Value) -> Result<WriteOutcome> {
        if let Some(doi) = get_path(entry, "pids.doi.identifier").and_then(Value::as_str) {
            if self.config.is_internal_doi(doi) {
                return Err(HarvestError::Writer(format!(
                    "refusing to create a record for internally issued DOI {doi}; \
                     the record it belongs to could not be found"
                )));
            }
        }

        let draft = self.store.create(entry).await?;
        info!(draft_id = %draft.id, "draft created");

        // All files or none. Any failure deletes the draft before the
        // error propagates.
        if let Err(err) = self.upload_all_files(&draft, entry).await {
            warn!(draft_id = %draft.id, %err, "file step failed, deleting draft");
            self.store.delete_draft(&draft).await?;
            return Err(err);
        }

        if !self.config.community_id.is_empty() {
            self.store.add_to_community(&draft, &self.config.community_id).await?;
        }

        let record_id = self.publish_or_rollback(&draft).await?;
        info!(%record_id, "record created and published");
        Ok(WriteOutcome::Created { record_id })
    }

    // ── Update ─────────────────────────────────────────────────────────

    async fn update(&self, entry: &Value, record_id: &str) -> Result<WriteOutcome> {
        let current = self.store.read(record_id).await?;

        let existing_checksums = checksum_set(&current);
        let incoming_checksums = checksum_set(entry);
        let files_differ = existing_checksums != incoming_checksums;

        let has_internal_doi = get_path(&current, "pids.doi.identifier").is_some()
            && get_path(&current, "pids.doi.provider").and_then(Value::as_str)
                == Some("datacite");

        let ctx = UpdateContext { source: Some("inspire".to_string()) };
        let merged = self
            .engine
            .update(&current, entry, &ctx)
            .map_err(|e| HarvestError::Writer(e.to_string()))?;
        for conflict in &merged.conflicts {
            warn!(path = %conflict.path, kind = %conflict.kind, "update conflict");
        }

        if files_differ && has_internal_doi {
            // The published DOI is bound to this file set; changed content
            // means a new version, never an in-place mutation.
            let record_id = self
                .create_new_version(record_id, entry, merged.updated, &current)
                .await?;
            Ok(WriteOutcome::Updated { record_id, conflicts: merged.conflicts })
        } else {
            let draft = self.store.edit(record_id).await?;
            debug!(draft_id = %draft.id, "edit draft opened");
            self.store.update_draft(&draft, &merged.updated).await?;
            if files_differ {
                self.sync_files(&draft, &current, entry).await?;
            }
            let record_id = self.publish_or_rollback(&draft).await?;
            info!(%record_id, "record updated in place");
            Ok(WriteOutcome::Updated { record_id, conflicts: merged.conflicts })
        }
    }

    async fn create_new_version(
        &self,
        record_id: &str,
        entry: &Value,
        mut merged: Value,
        current: &Value,
    ) -> Result<String> {
        let draft = self.store.new_version(record_id).await?;
        debug!(draft_id = %draft.id, "new version draft opened");

        let result: Result<()> = async {
            self.store.import_files(&draft).await?;
            self.sync_files(&draft, current, entry).await?;

            // A new version starts a fresh DOI lifecycle.
            if let Some(pids) = merged.get_mut("pids").and_then(Value::as_object_mut) {
                pids.remove("doi");
            }
            self.store.update_draft(&draft, &merged).await
        }
        .await;

        if let Err(err) = result {
            warn!(draft_id = %draft.id, %err, "new version failed, deleting draft");
            self.store.delete_draft(&draft).await?;
            return Err(err);
        }

        let record_id = self.publish_or_rollback(&draft).await?;
        info!(%record_id, "new record version published");
        Ok(record_id)
    }

    // ── Files ──────────────────────────────────────────────────────────

    async fn upload_all_files(&self, draft: &Draft, entry: &Value) -> Result<()> {
        let entries = file_entries(entry);
        debug!(n = entries.len(), "uploading files");
        for (key, file_data) in entries {
            self.upload_file(draft, &key, &file_data).await?;
        }
        Ok(())
    }

    /// Add files the incoming entry has and the draft's current set lacks,
    /// and delete draft files absent from the incoming entry. Matching is
    /// by checksum, the same comparison that triggered the sync.
    async fn sync_files(&self, draft: &Draft, current: &Value, entry: &Value) -> Result<()> {
        let existing = file_entries(current);
        let incoming = file_entries(entry);

        let existing_checksums: BTreeSet<String> = existing
            .iter()
            .filter_map(|(_, v)| checksum_of(v))
            .collect();
        let incoming_checksums: BTreeSet<String> = incoming
            .iter()
            .filter_map(|(_, v)| checksum_of(v))
            .collect();

        for (key, file_data) in &existing {
            if checksum_of(file_data).is_some_and(|c| !incoming_checksums.contains(&c)) {
                debug!(%key, "deleting file dropped upstream");
                self.store.delete_file(draft, key).await?;
            }
        }

        for (key, file_data) in &incoming {
            let is_new = checksum_of(file_data)
                .map_or(true, |c| !existing_checksums.contains(&c));
            if is_new {
                self.upload_file(draft, key, file_data).await?;
            }
        }
        Ok(())
    }

    async fn upload_file(&self, draft: &Draft, key: &str, file_data: &Value) -> Result<()> {
        let inspire_url = file_data
            .get("inspire_url")
            .and_then(Value::as_str)
            .ok_or_else(|| HarvestError::File(format!("file '{key}' has no source url")))?;

        let content = self.fetcher.fetch(inspire_url).await?;

        // The store only sees the file metadata, not our fetch bookkeeping.
        let mut init_data = file_data.as_object().cloned().unwrap_or_default();
        init_data.remove("inspire_url");
        self.store.init_file(draft, &Value::Object(init_data)).await?;
        self.store.set_file_content(draft, key, content).await?;
        let committed = self.store.commit_file(draft, key).await?;

        // The store derives its own checksum on commit; it must agree with
        // the one the source declared. Exempt-origin files carry none.
        if let Some(declared) = checksum_of(file_data) {
            if declared != committed.checksum {
                warn!(%key, %declared, committed = %committed.checksum, "checksum mismatch");
                self.store.delete_file(draft, key).await?;
                return Err(HarvestError::File(format!(
                    "file '{key}' checksum mismatch: expected {declared}, got {}",
                    committed.checksum
                )));
            }
        }
        debug!(%key, "file committed");
        Ok(())
    }

    async fn publish_or_rollback(&self, draft: &Draft) -> Result<String> {
        match self.store.publish(draft).await {
            Ok(record_id) => Ok(record_id),
            Err(err) => {
                warn!(draft_id = %draft.id, %err, "publish failed, deleting draft");
                self.store.delete_draft(draft).await?;
                Err(HarvestError::Writer(format!(
                    "draft {} not published: {err}",
                    draft.id
                )))
            }
        }
    }
}

fn file_entries(record: &Value) -> Vec<(String, Value)> {
    get_path(record, "files.entries")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn checksum_of(file_data: &Value) -> Option<String> {
    file_data
        .get("checksum")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// The set of file checksums on a record, used to decide whether file
/// content changed upstream.
pub(crate) fn checksum_set(record: &Value) -> BTreeSet<String> {
    file_entries(record)
        .iter()
        .filter_map(|(_, v)| checksum_of(v))
        .collect()
}
