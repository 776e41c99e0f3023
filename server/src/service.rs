//! The question-answering service behind the HTTP routes.

use finrag_core::{EmbeddingModel, LanguageModel};
use finrag_rag::{AnswerGenerator, GenerateError, RagError, Retriever};
use thiserror::Error;

/// Why a question could not be answered.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Embedding the question or searching the index failed.
    #[error(transparent)]
    Retrieval(#[from] RagError),

    /// The completion service failed.
    #[error(transparent)]
    Completion(#[from] GenerateError),
}

/// Retrieval plus generation, built once at start-up and shared by every request.
///
/// Nothing here is mutated after construction, so handlers hold it behind an `Arc` without
/// locking and requests never observe each other.
pub struct ChatService<M: EmbeddingModel, L: LanguageModel> {
    retriever: Retriever<M>,
    generator: AnswerGenerator<L>,
    top_k: usize,
}

impl<M: EmbeddingModel, L: LanguageModel> std::fmt::Debug for ChatService<M, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("retriever", &self.retriever)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl<M: EmbeddingModel, L: LanguageModel> ChatService<M, L> {
    /// Wires a built retriever to a generator.
    pub const fn new(retriever: Retriever<M>, generator: AnswerGenerator<L>, top_k: usize) -> Self {
        Self {
            retriever,
            generator,
            top_k,
        }
    }

    /// Answers one question: retrieve the top-k passages, then ground a completion on them.
    ///
    /// # Errors
    /// Returns [`ServiceError::Retrieval`] if the question cannot be embedded and
    /// [`ServiceError::Completion`] if the completion call fails.
    pub async fn answer(&self, query: &str) -> Result<String, ServiceError> {
        let retrieved = self.retriever.retrieve(query, self.top_k).await?;
        Ok(self.generator.generate(query, &retrieved).await?)
    }

    /// Number of indexed passages.
    pub fn passages(&self) -> usize {
        self.retriever.len()
    }

    /// Passages retrieved per question.
    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    /// The underlying retriever.
    pub const fn retriever(&self) -> &Retriever<M> {
        &self.retriever
    }
}
