//! Record store abstraction.
//!
//! The harvester never talks to the repository backend directly; everything
//! goes through this trait so the write path can be exercised against an
//! in-memory store in tests. The store is assumed to provide per-record
//! draft/publish transactional semantics.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use lithoscope_common::Result;

/// An unpublished working copy of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub id: String,
}

/// The search hits for one identifier filter.
#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    pub total: usize,
    pub ids: Vec<String>,
}

/// A file after the store has committed it and derived its own checksum.
#[derive(Debug, Clone)]
pub struct CommittedFile {
    pub key: String,
    pub checksum: String,
}

/// One way of looking up an already-harvested record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierFilter {
    /// Exact DOI match on the record's persistent identifiers.
    Doi(String),
    /// The store's own canonical record id.
    Pid(String),
    /// A scheme-tagged entry in `metadata.identifiers`.
    MetadataIdentifier { scheme: String, value: String },
    /// A scheme-tagged entry in `metadata.related_identifiers`.
    RelatedIdentifier { scheme: String, value: String },
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, data: &Value) -> Result<Draft>;
    async fn read(&self, id: &str) -> Result<Value>;
    async fn search(&self, filter: &IdentifierFilter) -> Result<SearchHits>;
    /// Open a metadata-edit draft on a published record.
    async fn edit(&self, id: &str) -> Result<Draft>;
    async fn update_draft(&self, draft: &Draft, data: &Value) -> Result<()>;
    /// Publish a draft, returning the id of the published record.
    async fn publish(&self, draft: &Draft) -> Result<String>;
    /// Open a new-version draft of a published record.
    async fn new_version(&self, id: &str) -> Result<Draft>;
    /// Copy the previous version's files into a new-version draft.
    async fn import_files(&self, draft: &Draft) -> Result<()>;
    async fn delete_draft(&self, draft: &Draft) -> Result<()>;

    async fn init_file(&self, draft: &Draft, metadata: &Value) -> Result<()>;
    async fn set_file_content(&self, draft: &Draft, key: &str, content: Bytes) -> Result<()>;
    async fn commit_file(&self, draft: &Draft, key: &str) -> Result<CommittedFile>;
    async fn delete_file(&self, draft: &Draft, key: &str) -> Result<()>;

    async fn add_to_community(&self, draft: &Draft, community_id: &str) -> Result<()>;
}
