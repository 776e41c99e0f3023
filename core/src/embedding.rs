//! # Embedding Module
//!
//! Embeddings are dense vector representations of text that capture semantic meaning. Similar
//! texts produce vectors that sit close together, which is what the retrieval pipeline relies on:
//! every knowledge passage and every incoming question is mapped into the same vector space and
//! compared by distance.
//!
//! An embedding model fixes its output dimension when it is loaded. Every vector that ends up in
//! a single index must come from the same model, otherwise distances are meaningless.
//!
//! Common dimensions:
//! - 384 (`all-MiniLM-L6-v2`, the default local model)
//! - 768 (`BERT-base`)
//! - 1536 (`OpenAI text-embedding-3-small`)
//!
//! ```rust
//! use finrag_core::EmbeddingModel;
//!
//! async fn example<T: EmbeddingModel>(model: &T) -> finrag_core::Result<()> {
//!     let embedding = model.embed("Bonds pay regular interest.").await?;
//!     assert_eq!(embedding.len(), model.dim());
//!     Ok(())
//! }
//! ```

use alloc::{boxed::Box, string::String, sync::Arc, vec::Vec};
use core::future::Future;

/// A type alias for an embedding vector of 32-bit floats.
///
/// The vector length is determined by the embedding model's architecture.
pub type Embedding = Vec<f32>;

/// Converts text to vector representations.
///
/// # Implementation Requirements
///
/// - [`embed`](EmbeddingModel::embed) must return vectors with length equal to [`dim`](EmbeddingModel::dim)
/// - Output must be deterministic for a fixed model version
/// - Inference errors are returned as-is; callers decide how to recover
///
/// # Example
///
/// ```rust
/// use finrag_core::EmbeddingModel;
///
/// struct ConstantEmbedding;
///
/// impl EmbeddingModel for ConstantEmbedding {
///     fn dim(&self) -> usize {
///         384
///     }
///
///     async fn embed(&self, _text: &str) -> finrag_core::Result<Vec<f32>> {
///         Ok(vec![0.0; self.dim()])
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let model = ConstantEmbedding;
/// let rows = model.embed_batch(&["a".to_string(), "b".to_string()]).await.unwrap();
/// assert_eq!(rows.len(), 2);
/// # });
/// ```
pub trait EmbeddingModel: Sized + Send + Sync {
    /// Returns the embedding vector dimension.
    fn dim(&self) -> usize;

    /// Converts a single text to an embedding vector of length [`Self::dim`](EmbeddingModel::dim).
    fn embed(&self, text: &str) -> impl Future<Output = crate::Result<Embedding>> + Send;

    /// Converts a batch of texts to embedding vectors.
    ///
    /// The returned rows are in input order, so `result[i]` is the embedding of `texts[i]`.
    ///
    /// # Note for Implementors
    /// The default implementation embeds one text at a time. Local models should override it to
    /// run a single padded batch through the network.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = crate::Result<Vec<Embedding>>> + Send {
        async move {
            let mut rows = Vec::with_capacity(texts.len());
            for text in texts {
                rows.push(self.embed(text).await?);
            }
            Ok(rows)
        }
    }
}

macro_rules! impl_embedding_model {
    ($($name:ident),*) => {
        $(
            impl<T: EmbeddingModel> EmbeddingModel for $name<T> {
                fn dim(&self) -> usize {
                    T::dim(self)
                }

                fn embed(&self, text: &str) -> impl Future<Output = crate::Result<Embedding>> + Send {
                    T::embed(self, text)
                }

                fn embed_batch(
                    &self,
                    texts: &[String],
                ) -> impl Future<Output = crate::Result<Vec<Embedding>>> + Send {
                    T::embed_batch(self, texts)
                }
            }
        )*
    };
}

impl_embedding_model!(Arc, Box);

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{string::ToString, vec};
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct MockEmbeddingModel {
        dimension: usize,
        calls: AtomicUsize,
    }

    impl MockEmbeddingModel {
        const fn new(dimension: usize) -> Self {
            Self {
                dimension,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingModel for MockEmbeddingModel {
        fn dim(&self) -> usize {
            self.dimension
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut embedding = vec![0.0; self.dimension];
            let text_len = text.len();

            for (i, value) in embedding.iter_mut().enumerate() {
                *value = (text_len + i) as f32 * 0.01;
            }

            Ok(embedding)
        }
    }

    #[tokio::test]
    async fn embedding_generation() {
        let model = MockEmbeddingModel::new(4);
        let embedding = model.embed("test").await.unwrap();

        assert_eq!(embedding.len(), 4);
        assert!((embedding[0] - 0.04).abs() < f32::EPSILON);
        assert!((embedding[3] - 0.07).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn default_batch_preserves_order() {
        let model = MockEmbeddingModel::new(2);
        let texts = vec!["a".to_string(), "abc".to_string(), String::new()];

        let rows = model.embed_batch(&texts).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        for (row, text) in rows.iter().zip(&texts) {
            assert_eq!(row, &model.embed(text).await.unwrap());
        }
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let model = MockEmbeddingModel::new(3);
        let rows = model.embed_batch(&[]).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn arc_forwards_to_inner_model() {
        let model = Arc::new(MockEmbeddingModel::new(5));
        assert_eq!(model.dim(), 5);
        let embedding = model.embed("shared").await.unwrap();
        assert_eq!(embedding.len(), 5);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }
}
