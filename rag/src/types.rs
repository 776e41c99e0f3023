//! Core types for the RAG crate.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Where a passage came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassageOrigin {
    /// Part of the fixed, hand-written knowledge list.
    Curated,
    /// Produced by a dynamic knowledge source at start-up.
    Source {
        /// Label of the source, e.g. "Household Spending Trends".
        label: String,
    },
}

/// An immutable unit of knowledge text. Its identity is its position in the [`Corpus`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Text content.
    pub text: String,
    /// Attribution.
    pub origin: PassageOrigin,
}

impl Passage {
    /// Creates a curated passage.
    #[must_use]
    pub fn curated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: PassageOrigin::Curated,
        }
    }

    /// Creates a passage attributed to a dynamic source.
    #[must_use]
    pub fn from_source(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: PassageOrigin::Source {
                label: label.into(),
            },
        }
    }
}

/// Ordered collection of passages. Fixed once the retriever is built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    passages: Vec<Passage>,
}

impl Corpus {
    /// Creates a corpus from passages in the given order.
    #[must_use]
    pub const fn new(passages: Vec<Passage>) -> Self {
        Self { passages }
    }

    /// Creates a corpus of curated passages.
    pub fn curated<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(Passage::curated).collect())
    }

    /// Returns the passage at `row`, if any.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&Passage> {
        self.passages.get(row)
    }

    /// Returns all passages in order.
    #[must_use]
    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    /// Returns owned copies of the passage texts, in order.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.passages.iter().map(|p| p.text.clone()).collect()
    }

    /// Number of passages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Returns `true` if the corpus has no passages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

impl From<Vec<Passage>> for Corpus {
    fn from(passages: Vec<Passage>) -> Self {
        Self::new(passages)
    }
}

/// Row-major stack of embedding vectors, all of the same dimension.
///
/// Row `i` is the embedding of passage `i` in the corpus it was built from.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingMatrix {
    dimension: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Stacks `rows` into a matrix.
    ///
    /// # Errors
    /// Returns [`RagError::DimensionMismatch`] if any row is not `dimension` long.
    pub fn from_rows(rows: Vec<Vec<f32>>, dimension: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * dimension);
        for row in rows {
            if row.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self { dimension, data })
    }

    /// Vector dimension `D`.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// Returns `true` if the matrix has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns row `i`, if present.
    #[must_use]
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Iterates rows in order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dimension.max(1))
    }
}

/// One nearest-neighbour hit from a [`VectorIndex`](crate::VectorIndex).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Row in the embedding matrix.
    pub row: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// A passage selected for a query, with its distance kept for diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// The passage.
    pub passage: Passage,
    /// Row of the passage in the corpus.
    pub row: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_rows_follow_insertion_order() {
        let matrix =
            EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 2).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(matrix.row(2), None);
        assert_eq!(matrix.rows().count(), 2);
    }

    #[test]
    fn matrix_rejects_ragged_rows() {
        let err = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]], 2).unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn empty_matrix_keeps_dimension() {
        let matrix = EmbeddingMatrix::from_rows(Vec::new(), 384).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.dimension(), 384);
        assert_eq!(matrix.rows().count(), 0);
    }

    #[test]
    fn corpus_keeps_attribution() {
        let corpus = Corpus::new(vec![
            Passage::curated("Bonds pay interest."),
            Passage::from_source("Tax Perception Insights", "Taxes are fair: Agree (40%)"),
        ]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get(0).unwrap().origin, PassageOrigin::Curated);
        assert_eq!(
            corpus.get(1).unwrap().origin,
            PassageOrigin::Source {
                label: "Tax Perception Insights".into()
            }
        );
        assert_eq!(corpus.texts()[0], "Bonds pay interest.");
    }
}
