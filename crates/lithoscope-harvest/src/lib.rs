//! Harvesting INSPIRE literature records into the repository.
//!
//! The flow per run: the reader pages through the INSPIRE search API, the
//! transform crate builds a repository payload per record, the resolver
//! decides create vs update, and the writer drives the record store
//! through draft, files and publish, cutting a new version when changed
//! file content meets an internally issued DOI.

pub mod fetch;
pub mod pipeline;
pub mod reader;
pub mod resolver;
pub mod store;
pub mod writer;

pub use fetch::{FileFetcher, HttpFileFetcher};
pub use pipeline::{HarvestJob, HarvestPipeline, HarvestReport};
pub use reader::{HarvestSelection, InspireReader};
pub use resolver::{ExistingRecordResolver, ResolveOutcome};
pub use store::{CommittedFile, Draft, IdentifierFilter, RecordStore, SearchHits};
pub use writer::{RecordWriter, WriteOutcome};
