//! Query-time retrieval over an immutable corpus.

use std::sync::Arc;
use std::time::Instant;

use finrag_core::EmbeddingModel;

use crate::error::{RagError, Result};
use crate::index::{FlatL2Index, VectorIndex};
use crate::types::{Corpus, EmbeddingMatrix, RetrievedPassage};

/// Embeds a corpus once and answers top-k queries against it.
///
/// The corpus, its embedding matrix and the index are built together and never change, so a
/// `Retriever` can sit behind an [`Arc`] and serve any number of concurrent queries.
pub struct Retriever<M: EmbeddingModel> {
    embedder: M,
    corpus: Arc<Corpus>,
    index: FlatL2Index,
}

impl<M: EmbeddingModel> std::fmt::Debug for Retriever<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("passages", &self.corpus.len())
            .field("dimension", &self.index.dimension())
            .finish_non_exhaustive()
    }
}

impl<M: EmbeddingModel> Retriever<M> {
    /// Embeds every passage with [`EmbeddingModel::embed_batch`] and builds the index.
    ///
    /// # Errors
    /// Fails if the embedder fails, returns the wrong number of rows, or returns a row whose
    /// length differs from [`EmbeddingModel::dim`].
    pub async fn build(embedder: M, corpus: Corpus) -> Result<Self> {
        let started = Instant::now();
        let dimension = embedder.dim();

        let rows = embedder
            .embed_batch(&corpus.texts())
            .await
            .map_err(RagError::Embedding)?;

        if rows.len() != corpus.len() {
            return Err(RagError::CorpusMismatch {
                passages: corpus.len(),
                rows: rows.len(),
            });
        }

        let matrix = EmbeddingMatrix::from_rows(rows, dimension)?;
        let index = FlatL2Index::build(matrix);

        tracing::info!(
            passages = corpus.len(),
            dimension,
            elapsed_ms = started.elapsed().as_millis(),
            "Knowledge index ready"
        );

        Ok(Self {
            embedder,
            corpus: Arc::new(corpus),
            index,
        })
    }

    /// Returns the texts of the `k` passages nearest to `query`, nearest first.
    ///
    /// # Errors
    /// Fails if the query cannot be embedded.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .retrieve_scored(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.passage.text)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve), keeping rows, distances and attribution.
    ///
    /// An empty corpus yields an empty result.
    ///
    /// # Errors
    /// Fails if the query cannot be embedded or has the wrong dimension.
    pub async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if self.corpus.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(RagError::Embedding)?;
        let hits = self.index.search(&vector, k)?;

        let retrieved: Vec<RetrievedPassage> = hits
            .into_iter()
            .filter_map(|hit| {
                self.corpus.get(hit.row).map(|passage| RetrievedPassage {
                    passage: passage.clone(),
                    row: hit.row,
                    distance: hit.distance,
                })
            })
            .collect();

        tracing::debug!(
            k,
            hits = retrieved.len(),
            rows = ?retrieved.iter().map(|r| r.row).collect::<Vec<_>>(),
            "Retrieved passages"
        );

        Ok(retrieved)
    }

    /// The indexed corpus.
    #[must_use]
    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// The embedding matrix; row `i` belongs to passage `i`.
    #[must_use]
    pub const fn matrix(&self) -> &EmbeddingMatrix {
        self.index.matrix()
    }

    /// The embedder used for passages and queries.
    #[must_use]
    pub const fn embedder(&self) -> &M {
        &self.embedder
    }

    /// Vector dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Number of passages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    /// Returns `true` if there is nothing to retrieve.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Passage;
    use anyhow::bail;

    const VOCAB: [&str; 5] = ["bond", "stock", "crypto", "edmonton", "tax"];

    /// Counts vocabulary words; deterministic and good enough to rank by topic.
    struct KeywordEmbedding;

    impl EmbeddingModel for KeywordEmbedding {
        fn dim(&self) -> usize {
            VOCAB.len()
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> finrag_core::Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(VOCAB
                .iter()
                .map(|word| lower.matches(word).count() as f32)
                .collect())
        }
    }

    struct ShortBatch;

    impl EmbeddingModel for ShortBatch {
        fn dim(&self) -> usize {
            2
        }

        async fn embed(&self, _text: &str) -> finrag_core::Result<Vec<f32>> {
            Ok(vec![0.0, 0.0])
        }

        async fn embed_batch(&self, _texts: &[String]) -> finrag_core::Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0, 0.0]])
        }
    }

    struct WrongWidth;

    impl EmbeddingModel for WrongWidth {
        fn dim(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> finrag_core::Result<Vec<f32>> {
            Ok(vec![1.0])
        }
    }

    struct Broken;

    impl EmbeddingModel for Broken {
        fn dim(&self) -> usize {
            1
        }

        async fn embed(&self, _text: &str) -> finrag_core::Result<Vec<f32>> {
            bail!("model not loaded")
        }
    }

    fn corpus() -> Corpus {
        Corpus::curated([
            "Bonds pay a fixed coupon; a bond returns principal at maturity.",
            "Stocks represent ownership; stock prices move with earnings.",
            "Crypto is volatile; crypto assets are not insured.",
            "Edmonton property tax is based on assessed value.",
        ])
    }

    #[tokio::test]
    async fn matrix_rows_parallel_corpus() {
        let retriever = Retriever::build(KeywordEmbedding, corpus()).await.unwrap();
        assert_eq!(retriever.len(), 4);
        assert_eq!(retriever.matrix().len(), retriever.corpus().len());
        assert_eq!(retriever.dimension(), VOCAB.len());

        for (row, passage) in retriever.corpus().passages().iter().enumerate() {
            let expected = KeywordEmbedding.embed(&passage.text).await.unwrap();
            assert_eq!(retriever.matrix().row(row), Some(expected.as_slice()));
        }
    }

    #[tokio::test]
    async fn returns_topical_passages_nearest_first() {
        let retriever = Retriever::build(KeywordEmbedding, corpus()).await.unwrap();
        let hits = retriever
            .retrieve_scored("Should I buy a crypto coin or a crypto token?", 2)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].row, 2);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn passage_text_retrieves_itself() {
        let retriever = Retriever::build(KeywordEmbedding, corpus()).await.unwrap();
        for passage in retriever.corpus().passages() {
            let hits = retriever.retrieve_scored(&passage.text, 1).await.unwrap();
            assert_eq!(hits[0].passage, *passage);
            assert!(hits[0].distance.abs() < f32::EPSILON);
        }
    }

    #[tokio::test]
    async fn retrieve_returns_texts_and_respects_k() {
        let retriever = Retriever::build(KeywordEmbedding, corpus()).await.unwrap();
        let texts = retriever.retrieve("bond", 10).await.unwrap();
        assert_eq!(texts.len(), 4);
        assert!(texts[0].starts_with("Bonds"));
        assert!(retriever.retrieve("bond", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_corpus_retrieves_nothing() {
        let retriever = Retriever::build(KeywordEmbedding, Corpus::default())
            .await
            .unwrap();
        assert!(retriever.is_empty());
        assert!(retriever.retrieve("bond", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn row_count_mismatch_is_rejected() {
        let err = Retriever::build(ShortBatch, corpus()).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::CorpusMismatch {
                passages: 4,
                rows: 1
            }
        ));
    }

    #[tokio::test]
    async fn wrong_row_width_is_rejected() {
        let corpus = Corpus::new(vec![Passage::curated("only one")]);
        let err = Retriever::build(WrongWidth, corpus).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 1 }));
    }

    #[tokio::test]
    async fn embedder_errors_propagate() {
        let err = Retriever::build(Broken, corpus()).await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert!(err.to_string().contains("model not loaded"));
    }
}
