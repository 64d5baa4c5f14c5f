use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::SearchResult;
use crate::error::{RetrievalError, RetrievalResult};

/// One embedded chunk of a knowledge document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Source document identifier.
    pub source: String,
    /// Chunk text.
    pub text: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
}

impl IndexedChunk {
    /// Create a chunk
    pub fn new(source: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            vector,
        }
    }
}

/// A pre-built index: `{model, dimension, chunks}` on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Embedding model that produced the vectors.
    pub model: String,
    /// Length of every vector.
    pub dimension: usize,
    chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Build an index, taking the dimension from the first chunk.
    pub fn new(model: impl Into<String>, chunks: Vec<IndexedChunk>) -> RetrievalResult<Self> {
        let dimension = chunks.first().map_or(0, |c| c.vector.len());
        let index = Self {
            model: model.into(),
            dimension,
            chunks,
        };
        index.validate()?;
        Ok(index)
    }

    /// Read and validate an index file.
    pub async fn load(path: &Path) -> RetrievalResult<Self> {
        let load_error = |message: String| RetrievalError::IndexLoad {
            path: path.display().to_string(),
            message,
        };

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_error(e.to_string()))?;
        let index: VectorIndex =
            serde_json::from_str(&raw).map_err(|e| load_error(format!("invalid index JSON: {}", e)))?;
        index.validate().map_err(|e| load_error(e.to_string()))?;

        info!(
            path = %path.display(),
            model = %index.model,
            dimension = index.dimension,
            chunks = index.len(),
            "Knowledge index loaded"
        );

        Ok(index)
    }

    fn validate(&self) -> RetrievalResult<()> {
        for chunk in &self.chunks {
            if chunk.vector.len() != self.dimension {
                return Err(RetrievalError::DimensionMismatch {
                    expected: self.dimension,
                    actual: chunk.vector.len(),
                });
            }
        }
        Ok(())
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `top_k` chunks closest to `query` by squared L2 distance.
    pub fn nearest(&self, query: &[f32], top_k: usize) -> RetrievalResult<Vec<SearchResult>> {
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut ranked: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|chunk| (squared_l2(query, &chunk.vector), chunk))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(distance, chunk)| SearchResult {
                source: chunk.source.clone(),
                text: chunk.text.clone(),
                score: 1.0 / (1.0 + distance),
            })
            .collect())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> VectorIndex {
        VectorIndex::new(
            "nomic-embed-text",
            vec![
                IndexedChunk::new("style.md", "命名使用蛇形", vec![0.0, 0.0, 1.0]),
                IndexedChunk::new("review.md", "评审需要两人通过", vec![1.0, 0.0, 0.0]),
                IndexedChunk::new("deploy.md", "部署前检查配置", vec![0.0, 1.0, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_orders_and_limits() {
        let results = sample().nearest(&[0.9, 0.1, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "review.md");
        assert_eq!(results[1].source, "deploy.md");
    }

    #[test]
    fn test_exact_match_scores_one() {
        let results = sample().nearest(&[0.0, 0.0, 1.0], 1).unwrap();
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_nearest_dimension_mismatch() {
        let err = sample().nearest(&[1.0, 0.0], 3).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_new_rejects_ragged_vectors() {
        let err = VectorIndex::new(
            "m",
            vec![
                IndexedChunk::new("a", "a", vec![1.0, 2.0]),
                IndexedChunk::new("b", "b", vec![1.0]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, RetrievalError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"model": "m", "dimension": 2, "chunks": [{{"source": "a.md", "text": "内容", "vector": [0.5, 0.5]}}]}}"#
        )
        .unwrap();

        let index = VectorIndex::load(file.path()).await.unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimension, 2);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = VectorIndex::load(Path::new("/nonexistent/index.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::IndexLoad { .. }));
    }

    #[tokio::test]
    async fn test_load_rejects_wrong_dimension() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"model": "m", "dimension": 3, "chunks": [{{"source": "a.md", "text": "x", "vector": [0.5, 0.5]}}]}}"#
        )
        .unwrap();

        let err = VectorIndex::load(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
    }
}
