//! Vector index implementations for RAG.
//!
//! This module provides the [`VectorIndex`] trait and the [`FlatL2Index`]
//! implementation for exact nearest neighbor search.

mod flat;

pub use flat::FlatL2Index;

use crate::error::Result;
use crate::types::SearchHit;

/// Trait for vector index implementations.
///
/// An index is built once from an embedding matrix and is read-only afterwards, so it can be
/// shared across threads without locking.
pub trait VectorIndex: Send + Sync {
    /// Returns up to `k` rows nearest to `query`, nearest first.
    ///
    /// Returns `min(k, len())` hits. Ties are broken by the lower row.
    ///
    /// # Errors
    /// Returns [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch) if the query
    /// length differs from [`dimension`](VectorIndex::dimension).
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Returns the embedding dimension.
    fn dimension(&self) -> usize;

    /// Returns the number of indexed rows.
    fn len(&self) -> usize;

    /// Returns `true` if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
