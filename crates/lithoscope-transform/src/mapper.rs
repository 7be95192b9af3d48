//! Mapper capability contract.

use async_trait::async_trait;
use serde_json::Value;

use lithoscope_common::json::{build_path, value_is_empty};

use crate::context::SerializationContext;

/// One stateless unit converting a slice of the source record into one
/// target field (or, with `returns_patch`, an arbitrary patch).
///
/// `map_value` must not mutate the source; value-shape problems are
/// reported via `ctx.error(...)` followed by `None`, never a panic.
#[async_trait]
pub trait Mapper: Send + Sync {
    /// Dotted target-field path; unique within one built pipeline.
    fn id(&self) -> &'static str;

    /// When true, `map_value` returns a ready nested patch instead of a
    /// value to be wrapped at `id`.
    fn returns_patch(&self) -> bool {
        false
    }

    async fn map_value(
        &self,
        src_metadata: &Value,
        src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value>;

    /// Wrap the mapped value into a single-key nested patch. Empty results
    /// (null, "", [], {}) yield no patch at all.
    async fn apply(
        &self,
        src_metadata: &Value,
        src_record: &Value,
        ctx: &mut SerializationContext,
    ) -> Option<Value> {
        let result = self.map_value(src_metadata, src_record, ctx).await?;
        if value_is_empty(&result) {
            return None;
        }
        if self.returns_patch() {
            Some(result)
        } else {
            Some(build_path(self.id(), result))
        }
    }
}
