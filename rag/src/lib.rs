//! Retrieval-augmented answering over a small, fixed knowledge corpus.
//!
//! The pipeline has three stages, each usable on its own:
//! - [`CorpusBuilder`] joins curated passages with blocks fetched from [`KnowledgeSource`]s.
//! - [`Retriever`] embeds the corpus once with any [`EmbeddingModel`](finrag_core::EmbeddingModel)
//!   and answers top-k queries through an exact [`FlatL2Index`].
//! - [`AnswerGenerator`] wraps any [`LanguageModel`](finrag_core::LanguageModel) and turns a
//!   question plus its retrieved passages into one grounded completion.
//!
//! Everything built at start-up is immutable afterwards, so the retriever and generator can be
//! shared behind an `Arc` without locks.

pub mod config;
pub mod corpus;
pub mod error;
pub mod generator;
pub mod index;
pub mod prompt;
pub mod retriever;
pub mod types;

pub use config::{RagConfig, RagConfigBuilder};
pub use corpus::{
    CorpusBuilder, DEFAULT_FETCH_TIMEOUT, KnowledgeSource, SourceReport, format_block,
};
pub use error::{GenerateError, RagError, Result};
pub use generator::AnswerGenerator;
pub use index::{FlatL2Index, VectorIndex};
pub use prompt::{NO_MATCH_MESSAGE, SYSTEM_PROMPT, build_prompt};
pub use retriever::Retriever;
pub use types::{Corpus, EmbeddingMatrix, Passage, PassageOrigin, RetrievedPassage, SearchHit};
