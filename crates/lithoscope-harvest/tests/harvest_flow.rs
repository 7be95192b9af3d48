//! End-to-end write-path tests against an in-memory record store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use lithoscope_common::config::HarvestConfig;
use lithoscope_common::json::get_path;
use lithoscope_common::{HarvestError, Result};
use lithoscope_harvest::{
    CommittedFile, Draft, FileFetcher, IdentifierFilter, RecordStore, RecordWriter, SearchHits,
    WriteOutcome,
};
use lithoscope_update::{default_strategy_table, UpdateEngine};

// ── Mock store ─────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct FileState {
    metadata: Value,
    content: Option<Bytes>,
    committed: bool,
}

#[derive(Clone)]
struct DraftState {
    data: Value,
    files: BTreeMap<String, FileState>,
    base: Option<String>,
    new_version: bool,
    community: Option<String>,
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, Value>,
    drafts: BTreeMap<String, DraftState>,
    next_id: usize,
    fail_publish: bool,
    corrupt_checksums: bool,
}

#[derive(Default)]
struct MockStore {
    inner: Mutex<Inner>,
}

impl MockStore {
    fn seed(&self, id: &str, record: Value) {
        self.inner.lock().unwrap().records.insert(id.to_string(), record);
    }

    fn record(&self, id: &str) -> Option<Value> {
        self.inner.lock().unwrap().records.get(id).cloned()
    }

    fn record_count(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    fn draft_count(&self) -> usize {
        self.inner.lock().unwrap().drafts.len()
    }

    fn set_fail_publish(&self, fail: bool) {
        self.inner.lock().unwrap().fail_publish = fail;
    }

    fn set_corrupt_checksums(&self, corrupt: bool) {
        self.inner.lock().unwrap().corrupt_checksums = corrupt;
    }

    fn file_entries_of(record: &Value) -> BTreeMap<String, FileState> {
        let mut files = BTreeMap::new();
        if let Some(entries) = get_path(record, "files.entries").and_then(Value::as_object) {
            for (key, metadata) in entries {
                files.insert(
                    key.clone(),
                    FileState { metadata: metadata.clone(), content: None, committed: true },
                );
            }
        }
        files
    }

    fn matches(record: &Value, record_id: &str, filter: &IdentifierFilter) -> bool {
        let in_list = |path: &str, scheme: &str, value: &str| {
            get_path(record, path)
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .any(|e| {
                    e.get("scheme").and_then(Value::as_str) == Some(scheme)
                        && e.get("identifier").and_then(Value::as_str) == Some(value)
                })
        };
        match filter {
            IdentifierFilter::Doi(doi) => {
                get_path(record, "pids.doi.identifier").and_then(Value::as_str)
                    == Some(doi.as_str())
            }
            IdentifierFilter::Pid(pid) => record_id == pid,
            IdentifierFilter::MetadataIdentifier { scheme, value } => {
                in_list("metadata.identifiers", scheme, value)
            }
            IdentifierFilter::RelatedIdentifier { scheme, value } => {
                in_list("metadata.related_identifiers", scheme, value)
            }
        }
    }
}

#[async_trait]
impl RecordStore for MockStore {
    async fn create(&self, data: &Value) -> Result<Draft> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("draft-{}", inner.next_id);
        inner.drafts.insert(
            id.clone(),
            DraftState {
                data: data.clone(),
                files: BTreeMap::new(),
                base: None,
                new_version: false,
                community: None,
            },
        );
        Ok(Draft { id })
    }

    async fn read(&self, id: &str) -> Result<Value> {
        self.record(id)
            .ok_or_else(|| HarvestError::Store(format!("no record {id}")))
    }

    async fn search(&self, filter: &IdentifierFilter) -> Result<SearchHits> {
        let inner = self.inner.lock().unwrap();
        let ids: Vec<String> = inner
            .records
            .iter()
            .filter(|(id, rec)| Self::matches(rec, id, filter))
            .map(|(id, _)| id.clone())
            .collect();
        Ok(SearchHits { total: ids.len(), ids })
    }

    async fn edit(&self, id: &str) -> Result<Draft> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| HarvestError::Store(format!("no record {id}")))?;
        inner.next_id += 1;
        let draft_id = format!("draft-{}", inner.next_id);
        inner.drafts.insert(
            draft_id.clone(),
            DraftState {
                files: Self::file_entries_of(&record),
                data: record,
                base: Some(id.to_string()),
                new_version: false,
                community: None,
            },
        );
        Ok(Draft { id: draft_id })
    }

    async fn update_draft(&self, draft: &Draft, data: &Value) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .drafts
            .get_mut(&draft.id)
            .ok_or_else(|| HarvestError::Store(format!("no draft {}", draft.id)))?;
        state.data = data.clone();
        Ok(())
    }

    async fn publish(&self, draft: &Draft) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_publish {
            return Err(HarvestError::Store("draft validation failed".to_string()));
        }
        let state = inner
            .drafts
            .remove(&draft.id)
            .ok_or_else(|| HarvestError::Store(format!("no draft {}", draft.id)))?;

        let record_id = match (&state.base, state.new_version) {
            (Some(base), true) => format!("{base}-v2"),
            (Some(base), false) => base.clone(),
            (None, _) => {
                inner.next_id += 1;
                format!("rec-{}", inner.next_id)
            }
        };

        let mut data = state.data.clone();
        let entries: serde_json::Map<String, Value> = state
            .files
            .iter()
            .map(|(k, f)| (k.clone(), f.metadata.clone()))
            .collect();
        if !entries.is_empty() || data.get("files").is_some() {
            data["files"] = json!({"enabled": true, "entries": entries});
        }
        inner.records.insert(record_id.clone(), data);
        Ok(record_id)
    }

    async fn new_version(&self, id: &str) -> Result<Draft> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| HarvestError::Store(format!("no record {id}")))?;
        inner.next_id += 1;
        let draft_id = format!("draft-{}", inner.next_id);
        inner.drafts.insert(
            draft_id.clone(),
            DraftState {
                data: record,
                files: BTreeMap::new(),
                base: Some(id.to_string()),
                new_version: true,
                community: None,
            },
        );
        Ok(Draft { id: draft_id })
    }

    async fn import_files(&self, draft: &Draft) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .drafts
            .get(&draft.id)
            .ok_or_else(|| HarvestError::Store(format!("no draft {}", draft.id)))?;
        let base = state
            .base
            .clone()
            .ok_or_else(|| HarvestError::Store("draft has no previous version".to_string()))?;
        let files = Self::file_entries_of(
            inner
                .records
                .get(&base)
                .ok_or_else(|| HarvestError::Store(format!("no record {base}")))?,
        );
        inner.drafts.get_mut(&draft.id).unwrap().files = files;
        Ok(())
    }

    async fn delete_draft(&self, draft: &Draft) -> Result<()> {
        self.inner.lock().unwrap().drafts.remove(&draft.id);
        Ok(())
    }

    async fn init_file(&self, draft: &Draft, metadata: &Value) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = metadata
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| HarvestError::File("file metadata without key".to_string()))?
            .to_string();
        let state = inner
            .drafts
            .get_mut(&draft.id)
            .ok_or_else(|| HarvestError::Store(format!("no draft {}", draft.id)))?;
        state.files.insert(
            key,
            FileState { metadata: metadata.clone(), content: None, committed: false },
        );
        Ok(())
    }

    async fn set_file_content(&self, draft: &Draft, key: &str, content: Bytes) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .drafts
            .get_mut(&draft.id)
            .ok_or_else(|| HarvestError::Store(format!("no draft {}", draft.id)))?;
        let file = state
            .files
            .get_mut(key)
            .ok_or_else(|| HarvestError::File(format!("file {key} not initialized")))?;
        file.content = Some(content);
        Ok(())
    }

    async fn commit_file(&self, draft: &Draft, key: &str) -> Result<CommittedFile> {
        let mut inner = self.inner.lock().unwrap();
        let corrupt = inner.corrupt_checksums;
        let state = inner
            .drafts
            .get_mut(&draft.id)
            .ok_or_else(|| HarvestError::Store(format!("no draft {}", draft.id)))?;
        let file = state
            .files
            .get_mut(key)
            .ok_or_else(|| HarvestError::File(format!("file {key} not initialized")))?;
        file.committed = true;
        let checksum = if corrupt {
            "md5:corrupted".to_string()
        } else {
            file.metadata
                .get("checksum")
                .and_then(Value::as_str)
                .unwrap_or("md5:derived")
                .to_string()
        };
        Ok(CommittedFile { key: key.to_string(), checksum })
    }

    async fn delete_file(&self, draft: &Draft, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .drafts
            .get_mut(&draft.id)
            .ok_or_else(|| HarvestError::Store(format!("no draft {}", draft.id)))?;
        state.files.remove(key);
        Ok(())
    }

    async fn add_to_community(&self, draft: &Draft, community_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .drafts
            .get_mut(&draft.id)
            .ok_or_else(|| HarvestError::Store(format!("no draft {}", draft.id)))?;
        state.community = Some(community_id.to_string());
        Ok(())
    }
}

// ── Fixture plumbing ───────────────────────────────────────────────────

struct StaticFetcher {
    fail: bool,
}

#[async_trait]
impl FileFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        if self.fail {
            return Err(HarvestError::File(format!("fetch exhausted retries for {url}")));
        }
        Ok(Bytes::from_static(b"%PDF-1.4 content"))
    }
}

fn writer(store: Arc<MockStore>, fetch_fails: bool) -> RecordWriter {
    let config = Arc::new(HarvestConfig::default());
    RecordWriter::new(
        store,
        Arc::new(StaticFetcher { fail: fetch_fails }),
        UpdateEngine::new(default_strategy_table()),
        config,
    )
}

fn entry(inspire_id: &str, checksum: &str, doi: Option<(&str, &str)>) -> Value {
    let mut payload = json!({
        "id": inspire_id,
        "metadata": {
            "title": "A measurement",
            "resource_type": {"id": "publication-dissertation"},
            "publication_date": "2024-06",
            "creators": [{
                "person_or_org": {"type": "personal", "family_name": "Doe", "given_name": "Jane"}
            }],
            "related_identifiers": [{
                "scheme": "inspire",
                "identifier": inspire_id,
                "relation_type": {"id": "isvariantformof"},
            }],
        },
        "custom_fields": {},
        "files": {"enabled": true, "entries": {
            "thesis.pdf": {
                "key": "thesis.pdf",
                "checksum": checksum,
                "access": {"hidden": false},
                "inspire_url": "https://inspirehep.net/files/abc",
            }
        }},
        "parent": {"access": {"owned_by": {"user": "system"}}},
        "access": {"record": "public", "files": "public"},
    });
    if let Some((identifier, provider)) = doi {
        payload["pids"] = json!({"doi": {"identifier": identifier, "provider": provider}});
    }
    payload
}

// ── Tests ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_then_rerun_is_idempotent() {
    let store = Arc::new(MockStore::default());
    let writer = writer(store.clone(), false);
    let payload = entry("1001", "md5:aaa", None);

    let outcome = writer.write(&payload).await.unwrap();
    let WriteOutcome::Created { record_id } = outcome else {
        panic!("expected create");
    };
    assert_eq!(store.record_count(), 1);
    let first = store.record(&record_id).unwrap();

    // Second pass with identical upstream data resolves to the stored
    // record and changes nothing.
    let outcome = writer.write(&payload).await.unwrap();
    let WriteOutcome::Updated { record_id: updated_id, conflicts } = outcome else {
        panic!("expected update");
    };
    assert_eq!(updated_id, record_id);
    assert!(conflicts.is_empty());
    assert_eq!(store.record_count(), 1);
    assert_eq!(store.record(&record_id).unwrap(), first);
    assert_eq!(store.draft_count(), 0);
}

#[tokio::test]
async fn test_changed_files_with_internal_doi_cut_a_new_version() {
    let store = Arc::new(MockStore::default());
    store.seed("rec-1", entry("1001", "md5:aaa", Some(("10.17181/abc", "datacite"))));
    let writer = writer(store.clone(), false);

    let incoming = entry("1001", "md5:bbb", Some(("10.17181/abc", "datacite")));
    let outcome = writer.write(&incoming).await.unwrap();
    let WriteOutcome::Updated { record_id, .. } = outcome else {
        panic!("expected update");
    };

    assert_eq!(record_id, "rec-1-v2");
    let version = store.record("rec-1-v2").unwrap();
    // Fresh DOI lifecycle: the carried-over metadata loses its DOI.
    assert!(get_path(&version, "pids.doi").is_none());
    assert_eq!(version["files"]["entries"]["thesis.pdf"]["checksum"], "md5:bbb");
    assert_eq!(store.draft_count(), 0);
}

#[tokio::test]
async fn test_changed_files_with_external_doi_update_in_place() {
    let store = Arc::new(MockStore::default());
    store.seed("rec-1", entry("1001", "md5:aaa", Some(("10.1000/xyz", "external"))));
    let writer = writer(store.clone(), false);

    let incoming = entry("1001", "md5:bbb", Some(("10.1000/xyz", "external")));
    let outcome = writer.write(&incoming).await.unwrap();
    let WriteOutcome::Updated { record_id, .. } = outcome else {
        panic!("expected update");
    };

    assert_eq!(record_id, "rec-1");
    assert_eq!(store.record_count(), 1);
    let record = store.record("rec-1").unwrap();
    assert_eq!(
        get_path(&record, "pids.doi.identifier").and_then(Value::as_str),
        Some("10.1000/xyz")
    );
    assert_eq!(record["files"]["entries"]["thesis.pdf"]["checksum"], "md5:bbb");
}

#[tokio::test]
async fn test_ambiguous_match_mutates_nothing() {
    let store = Arc::new(MockStore::default());
    store.seed("rec-1", entry("1001", "md5:aaa", None));
    store.seed("rec-2", entry("1001", "md5:aaa", None));
    let writer = writer(store.clone(), false);

    let err = writer.write(&entry("1001", "md5:bbb", None)).await.unwrap_err();
    assert!(err.to_string().contains("multiple existing records"));
    assert_eq!(store.record_count(), 2);
    assert_eq!(store.draft_count(), 0);
    let untouched = store.record("rec-1").unwrap();
    assert_eq!(untouched["files"]["entries"]["thesis.pdf"]["checksum"], "md5:aaa");
}

#[tokio::test]
async fn test_create_is_atomic_on_fetch_failure() {
    let store = Arc::new(MockStore::default());
    let writer = writer(store.clone(), true);

    let err = writer.write(&entry("1001", "md5:aaa", None)).await.unwrap_err();
    assert!(err.to_string().contains("fetch exhausted"));
    assert_eq!(store.record_count(), 0);
    assert_eq!(store.draft_count(), 0);
}

#[tokio::test]
async fn test_create_rejects_internally_issued_doi() {
    let store = Arc::new(MockStore::default());
    let writer = writer(store.clone(), false);

    let payload = entry("1001", "md5:aaa", Some(("10.17181/zzz", "datacite")));
    let err = writer.write(&payload).await.unwrap_err();
    assert!(err.to_string().contains("internally issued DOI"));
    assert_eq!(store.record_count(), 0);
    assert_eq!(store.draft_count(), 0);
}

#[tokio::test]
async fn test_checksum_mismatch_rolls_back_create() {
    let store = Arc::new(MockStore::default());
    store.set_corrupt_checksums(true);
    let writer = writer(store.clone(), false);

    let err = writer.write(&entry("1001", "md5:aaa", None)).await.unwrap_err();
    assert!(err.to_string().contains("checksum mismatch"));
    assert_eq!(store.record_count(), 0);
    assert_eq!(store.draft_count(), 0);
}

#[tokio::test]
async fn test_publish_failure_deletes_draft() {
    let store = Arc::new(MockStore::default());
    store.set_fail_publish(true);
    let writer = writer(store.clone(), false);

    let err = writer.write(&entry("1001", "md5:aaa", None)).await.unwrap_err();
    assert!(err.to_string().contains("not published"));
    assert_eq!(store.record_count(), 0);
    assert_eq!(store.draft_count(), 0);
}
