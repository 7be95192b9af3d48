//! lithoscope-transform — INSPIRE record to repository record mapping.
//! - Resource-type detection (priority ranking + derived preprint)
//! - Declarative mapper pipeline with per-resource-type policy
//! - Record builder assembling the final submission payload

pub mod builder;
pub mod config;
pub mod context;
pub mod lang;
pub mod mapper;
pub mod mappers;
pub mod policies;
pub mod resource_types;
pub mod vocabulary;

pub use builder::RecordBuilder;
pub use context::SerializationContext;
pub use mapper::Mapper;
pub use policies::MapperPolicy;
pub use resource_types::{ResourceType, ResourceTypeDetector};
pub use vocabulary::{VocabularyService, VocabularySearchResult};
