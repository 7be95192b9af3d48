//! Field mappers, one per target field or field group.

pub mod basic_metadata;
pub mod contributors;
pub mod custom_fields;
pub mod files;
pub mod identifiers;
pub mod thesis;
