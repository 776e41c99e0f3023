//! Brute-force exact search under squared Euclidean distance.

use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use super::VectorIndex;
use crate::error::{RagError, Result};
use crate::types::{EmbeddingMatrix, SearchHit};

/// Exact nearest-neighbour index over an [`EmbeddingMatrix`].
///
/// Every query scans all rows. Distances are computed in parallel, and a bounded max-heap keyed
/// by `(distance, row)` keeps the best `k`, which makes results fully deterministic.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    matrix: EmbeddingMatrix,
}

impl FlatL2Index {
    /// Builds an index over `matrix`. Works for any number of rows, including zero.
    #[must_use]
    pub const fn build(matrix: EmbeddingMatrix) -> Self {
        Self { matrix }
    }

    /// The indexed matrix.
    #[must_use]
    pub const fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }
}

impl VectorIndex for FlatL2Index {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let dimension = self.matrix.dimension();
        if query.len() != dimension {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.matrix.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let distances: Vec<f32> = self
            .matrix
            .rows()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|row| squared_l2(row, query))
            .collect();

        let mut heap: BinaryHeap<(OrderedFloat<f32>, usize)> = BinaryHeap::with_capacity(k + 1);
        for (row, distance) in distances.into_iter().enumerate() {
            let candidate = (OrderedFloat(distance), row);
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|(distance, row)| SearchHit {
                row,
                distance: distance.into_inner(),
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.matrix.dimension()
    }

    fn len(&self) -> usize {
        self.matrix.len()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(rows: Vec<Vec<f32>>) -> FlatL2Index {
        let dim = rows.first().map_or(2, Vec::len);
        FlatL2Index::build(EmbeddingMatrix::from_rows(rows, dim).unwrap())
    }

    fn rows_of(hits: &[SearchHit]) -> Vec<usize> {
        hits.iter().map(|hit| hit.row).collect()
    }

    #[test]
    fn nearest_first() {
        let idx = index(vec![vec![0.0, 0.0], vec![5.0, 5.0], vec![1.0, 0.0]]);
        let hits = idx.search(&[0.9, 0.0], 3).unwrap();
        assert_eq!(rows_of(&hits), vec![2, 0, 1]);
        assert!((hits[0].distance - 0.01).abs() < 1e-6);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn k_larger_than_corpus_returns_everything() {
        let idx = index(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let hits = idx.search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn k_zero_returns_nothing() {
        let idx = index(vec![vec![1.0, 0.0]]);
        assert!(idx.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn empty_index_returns_nothing() {
        let idx = FlatL2Index::build(EmbeddingMatrix::from_rows(Vec::new(), 3).unwrap());
        assert!(idx.is_empty());
        assert!(idx.search(&[0.0, 0.0, 0.0], 2).unwrap().is_empty());
    }

    #[test]
    fn ties_prefer_lower_row() {
        let idx = index(vec![
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, -1.0],
        ]);
        let hits = idx.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(rows_of(&hits), vec![0, 1]);
    }

    #[test]
    fn search_is_deterministic() {
        let rows: Vec<Vec<f32>> = (0..200)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = (i % 17) as f32;
                vec![x, -x]
            })
            .collect();
        let idx = index(rows);
        let first = idx.search(&[3.0, -3.0], 5).unwrap();
        for _ in 0..10 {
            assert_eq!(idx.search(&[3.0, -3.0], 5).unwrap(), first);
        }
    }

    #[test]
    fn wrong_query_dimension_is_rejected() {
        let idx = index(vec![vec![1.0, 0.0]]);
        let err = idx.search(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }
}
