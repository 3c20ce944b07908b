//! Dense vector index with exact dot-product search.
//!
//! [`VectorIndex`] stores chunks alongside a contiguous row-major embedding
//! matrix (row `i` belongs to chunk `i`). It is immutable once built: a changed
//! corpus means building a new index. Because nothing mutates after
//! construction, a shared `&VectorIndex` can serve concurrent queries without
//! locking.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// An ordered collection of `(Chunk, embedding)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimensions: usize,
    chunks: Vec<Chunk>,
    matrix: Vec<f32>,
}

impl VectorIndex {
    /// An index with no entries.
    pub fn empty(dimensions: usize) -> Self {
        Self { dimensions, chunks: Vec::new(), matrix: Vec::new() }
    }

    /// Build an index from chunks and a row-major matrix of embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the matrix does not hold
    /// exactly one `dimensions`-wide row per chunk.
    pub fn from_matrix(chunks: Vec<Chunk>, matrix: Vec<f32>, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::InvalidConfiguration(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        let expected = chunks.len() * dimensions;
        if matrix.len() != expected {
            return Err(RagError::DimensionMismatch { expected, actual: matrix.len() });
        }
        Ok(Self { dimensions, chunks, matrix })
    }

    /// Build an index from chunks and one embedding per chunk.
    pub fn from_rows(chunks: Vec<Chunk>, rows: Vec<Vec<f32>>, dimensions: usize) -> Result<Self> {
        if rows.len() != chunks.len() {
            return Err(RagError::InvalidConfiguration(format!(
                "{} embeddings supplied for {} chunks",
                rows.len(),
                chunks.len()
            )));
        }
        let mut matrix = Vec::with_capacity(rows.len() * dimensions);
        for row in rows {
            if row.len() != dimensions {
                return Err(RagError::DimensionMismatch { expected: dimensions, actual: row.len() });
            }
            matrix.extend(row);
        }
        Self::from_matrix(chunks, matrix, dimensions)
    }

    /// Embed every chunk exactly once, in order, and build the index.
    ///
    /// Chunk texts are sent to the provider `batch_size` at a time.
    ///
    /// # Errors
    ///
    /// Propagates provider failures unchanged and returns
    /// [`RagError::DimensionMismatch`] if the provider returns a vector of the
    /// wrong size.
    pub async fn build(
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self> {
        let rows = embed_chunks(&chunks, provider, batch_size).await?;
        Self::from_rows(chunks, rows, provider.dimensions())
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Indexed chunks in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The row-major embedding matrix.
    pub fn matrix(&self) -> &[f32] {
        &self.matrix
    }

    /// Embedding row for chunk `i`.
    pub fn embedding(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dimensions)?;
        self.matrix.get(start..start + self.dimensions)
    }

    /// Return the `k` chunks with the highest dot product against `query`.
    ///
    /// Results are sorted by descending score; equal scores keep insertion
    /// order. Returns `min(k, len)` results.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `k == 0` and
    /// [`RagError::DimensionMismatch`] if the query has the wrong size.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidConfiguration("k must be greater than zero".to_string()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let scores = self.matrix.chunks_exact(self.dimensions).map(|row| dot(row, query));
        let top = top_k(scores, k.min(self.len()));
        debug!(candidates = self.len(), k, returned = top.len(), "vector search");

        Ok(top
            .into_iter()
            .map(|(index, score)| SearchResult { chunk: self.chunks[index].clone(), score })
            .collect())
    }

    /// Embed `query` once and [`search`](Self::search) with it.
    pub async fn query(
        &self,
        provider: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidConfiguration("k must be greater than zero".to_string()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = provider.embed(query).await?;
        self.search(&embedding, k)
    }
}

/// Embed chunk texts in batches, preserving order.
pub(crate) async fn embed_chunks(
    chunks: &[Chunk],
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut rows = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let embeddings = provider.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: provider.model_id(),
                message: format!(
                    "provider returned {} embeddings for {} texts",
                    embeddings.len(),
                    texts.len()
                ),
            });
        }
        rows.extend(embeddings);
    }
    Ok(rows)
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Heap entry ordered so that "greater" means "ranks earlier".
#[derive(Debug, Clone, Copy)]
struct Ranked {
    key: f32,
    score: f32,
    index: usize,
}

impl Ranked {
    fn new(index: usize, score: f32) -> Self {
        // NaN sorts last; -0.0 and 0.0 must tie.
        let key = if score.is_nan() {
            f32::NEG_INFINITY
        } else if score == 0.0 {
            0.0
        } else {
            score
        };
        Self { key, score, index }
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key).then_with(|| other.index.cmp(&self.index))
    }
}

/// Select the best `k` `(index, score)` pairs, best first.
fn top_k(scores: impl Iterator<Item = f32>, k: usize) -> Vec<(usize, f32)> {
    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k + 1);
    for (index, score) in scores.enumerate() {
        let candidate = Ranked::new(index, score);
        if heap.len() < k {
            heap.push(Reverse(candidate));
        } else if heap.peek().is_some_and(|Reverse(worst)| candidate > *worst) {
            heap.pop();
            heap.push(Reverse(candidate));
        }
    }

    let mut ranked: Vec<Ranked> = heap.into_iter().map(|Reverse(r)| r).collect();
    ranked.sort_by(|a, b| b.cmp(a));
    ranked.into_iter().map(|r| (r.index, r.score)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_prefers_lower_index_on_ties() {
        let top = top_k([1.0, 3.0, 3.0, 2.0, 3.0].into_iter(), 3);
        assert_eq!(top.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn top_k_ranks_nan_last() {
        let top = top_k([f32::NAN, -5.0, 0.5].into_iter(), 3);
        assert_eq!(top.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![2, 1, 0]);
        assert!(top[2].1.is_nan());
    }

    #[test]
    fn signed_zeros_tie() {
        let top = top_k([-0.0, 0.0].into_iter(), 2);
        assert_eq!(top.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1]);
    }
}
