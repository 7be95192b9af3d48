//! Update engine and its result data structures.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::field::FieldUpdate;

/// A field that could not be safely auto-merged. Conflicts are surfaced in
/// the result for human review, never silently resolved by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateConflict {
    pub path: String,
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming: Option<Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl UpdateConflict {
    pub fn new(path: &str, kind: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            kind: kind.to_string(),
            message: message.into(),
            current: None,
            incoming: None,
            details: Map::new(),
        }
    }

    pub fn with_current(mut self, current: Value) -> Self {
        self.current = Some(current);
        self
    }

    pub fn with_incoming(mut self, incoming: Value) -> Self {
        self.incoming = Some(incoming);
        self
    }

    pub fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

/// The outcome of one strategy, or of a whole engine run: the (partially)
/// merged record plus everything the merge wants a human to know.
#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub updated: Value,
    pub conflicts: Vec<UpdateConflict>,
    pub audit: Vec<String>,
}

impl UpdateResult {
    /// No change, nothing to report.
    pub fn unchanged(current: &Value) -> Self {
        Self {
            updated: current.clone(),
            conflicts: Vec::new(),
            audit: Vec::new(),
        }
    }

    pub fn updated(updated: Value, audit: Vec<String>) -> Self {
        Self { updated, conflicts: Vec::new(), audit }
    }

    pub fn conflicted(current: &Value, conflict: UpdateConflict) -> Self {
        Self {
            updated: current.clone(),
            conflicts: vec![conflict],
            audit: Vec::new(),
        }
    }
}

/// Carried through one engine run.
#[derive(Debug, Clone, Default)]
pub struct UpdateContext {
    /// Where the incoming record came from, for audit messages.
    pub source: Option<String>,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("update produced {} conflict(s) in strict mode", .0.len())]
    Conflicts(Vec<UpdateConflict>),
}

/// Applies every configured strategy in table order. Conflicts accumulate
/// across strategies and never short-circuit later fields; strict mode only
/// changes what happens after the full pass.
pub struct UpdateEngine {
    strategies: Vec<(String, Box<dyn FieldUpdate>)>,
    pub fail_on_conflict: bool,
}

impl UpdateEngine {
    pub fn new(strategies: Vec<(String, Box<dyn FieldUpdate>)>) -> Self {
        Self { strategies, fail_on_conflict: false }
    }

    pub fn strict(mut self) -> Self {
        self.fail_on_conflict = true;
        self
    }

    #[instrument(skip_all, fields(source = ctx.source.as_deref().unwrap_or("unknown")))]
    pub fn update(
        &self,
        current: &Value,
        incoming: &Value,
        ctx: &UpdateContext,
    ) -> Result<UpdateResult, UpdateError> {
        let mut updated = current.clone();
        let mut conflicts = Vec::new();
        let mut audit = Vec::new();

        for (path, strategy) in &self.strategies {
            let res = strategy.update(&updated, incoming, path, ctx);
            updated = res.updated;
            conflicts.extend(res.conflicts);
            audit.extend(res.audit);
        }

        debug!(
            conflict_count = conflicts.len(),
            audit_count = audit.len(),
            "update pass finished"
        );

        if self.fail_on_conflict && !conflicts.is_empty() {
            return Err(UpdateError::Conflicts(conflicts));
        }

        Ok(UpdateResult { updated, conflicts, audit })
    }
}
