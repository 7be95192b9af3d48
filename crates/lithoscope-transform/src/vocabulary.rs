//! Vocabulary lookup collaborator.
//!
//! Resolves free-text accelerator/experiment tags to canonical vocabulary
//! ids. Only the search contract is specified here; the production
//! implementation lives with the repository platform.

use async_trait::async_trait;
use serde_json::Value;
use tracing::error;

use crate::context::SerializationContext;

#[derive(Debug, Clone, Default)]
pub struct VocabularySearchResult {
    pub total: u64,
    pub hits: Vec<Value>,
}

#[async_trait]
pub trait VocabularyService: Send + Sync {
    async fn search(&self, term: &str, vocab_type: &str) -> anyhow::Result<VocabularySearchResult>;
}

/// Search a vocabulary, quoting terms containing slashes. Lookup failures
/// are logged and reported as an empty result; the mapper decides what to
/// do with a non-single hit count.
pub async fn search_vocabulary(
    service: &dyn VocabularyService,
    term: &str,
    vocab_type: &str,
    ctx: &SerializationContext,
) -> VocabularySearchResult {
    let quoted;
    let term = if term.contains('/') {
        quoted = format!("\"{term}\"");
        &quoted
    } else {
        term
    };

    match service.search(term, vocab_type).await {
        Ok(result) => result,
        Err(e) => {
            error!(
                inspire_id = %ctx.inspire_id,
                term,
                vocab_type,
                "vocabulary search failed: {e}"
            );
            VocabularySearchResult::default()
        }
    }
}
