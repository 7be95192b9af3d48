//! Field update capability contract.

use serde_json::Value;

use crate::engine::{UpdateContext, UpdateResult};

/// One merge strategy scoped to a single dotted field path.
///
/// `update` receives the whole current and incoming records and returns a
/// new whole record; it must never mutate its inputs and must never remove
/// data outside its own path.
pub trait FieldUpdate: Send + Sync {
    fn update(
        &self,
        current: &Value,
        incoming: &Value,
        path: &str,
        ctx: &UpdateContext,
    ) -> UpdateResult;
}
