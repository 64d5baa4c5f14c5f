//! Knowledge retrieval over a pre-built vector index.
//!
//! The index is produced offline; this module only loads it, embeds queries
//! and ranks chunks by distance.

mod index;

pub use index::{IndexedChunk, VectorIndex};

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RetrievalError, RetrievalResult};
use crate::llm::Embedder;
use crate::prompts::NO_DOCUMENTS_PLACEHOLDER;

/// A retrieved knowledge chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Source document identifier.
    pub source: String,
    /// Chunk text.
    pub text: String,
    /// Similarity in (0, 1]; higher is closer.
    pub score: f32,
}

/// Nearest-neighbour search over the knowledge base.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` results, best first.
    async fn search(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<SearchResult>>;
}

/// Embeds the query and searches a [`VectorIndex`].
pub struct VectorRetriever {
    embedder: Arc<dyn Embedder>,
    index: OnceLock<VectorIndex>,
}

impl VectorRetriever {
    /// Create a retriever with no index loaded yet
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            index: OnceLock::new(),
        }
    }

    /// Create a retriever over an already loaded index
    pub fn with_index(embedder: Arc<dyn Embedder>, index: VectorIndex) -> Self {
        let retriever = Self::new(embedder);
        let _ = retriever.index.set(index);
        retriever
    }

    /// Load the index file. Returns the number of chunks.
    ///
    /// A second load keeps the first index.
    pub async fn load(&self, path: impl AsRef<std::path::Path>) -> RetrievalResult<usize> {
        let index = VectorIndex::load(path.as_ref()).await?;
        let chunks = index.len();

        if self.index.set(index).is_err() {
            warn!(path = %path.as_ref().display(), "Knowledge index already loaded, ignoring reload");
        }

        Ok(chunks)
    }

    /// Whether an index is loaded
    pub fn is_initialized(&self) -> bool {
        self.index.get().is_some()
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn search(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<SearchResult>> {
        let index = self.index.get().ok_or(RetrievalError::NotInitialized)?;
        let start = Instant::now();

        let vector = self.embedder.embed(query).await?;
        let results = index.nearest(&vector, top_k)?;

        info!(
            results = results.len(),
            top_k,
            best_score = results.first().map(|r| r.score),
            latency_ms = start.elapsed().as_millis(),
            "Knowledge search completed"
        );
        for result in &results {
            debug!(source = %result.source, score = result.score, "Retrieved chunk");
        }

        Ok(results)
    }
}

/// Render results as numbered `【n】` snippets for the knowledge prompt.
pub fn format_search_results(results: &[SearchResult], snippet_chars: usize) -> String {
    if results.is_empty() {
        return NO_DOCUMENTS_PLACEHOLDER.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let snippet: String = result.text.chars().take(snippet_chars).collect();
            format!("【{}】{}...", i + 1, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
