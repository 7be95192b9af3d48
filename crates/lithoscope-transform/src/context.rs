//! Per-record serialization context.

use crate::resource_types::ResourceType;

/// Carried through one record's mapping run. Mapping problems are recorded
/// here as human-readable strings; they never abort the record.
#[derive(Debug, Clone)]
pub struct SerializationContext {
    pub resource_type: Option<ResourceType>,
    pub inspire_id: String,
    pub errors: Vec<String>,
}

impl SerializationContext {
    pub fn new(resource_type: Option<ResourceType>, inspire_id: impl Into<String>) -> Self {
        Self {
            resource_type,
            inspire_id: inspire_id.into(),
            errors: Vec::new(),
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}
