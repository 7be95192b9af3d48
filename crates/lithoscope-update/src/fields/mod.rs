pub mod base;
pub mod creatibutors;
pub mod custom_fields;
pub mod identifiers;
pub mod metadata;
