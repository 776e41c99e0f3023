#![no_std]
//! # finrag
//!
//! Façade crate that re-exports [`finrag_core`] and, behind features, the provider and pipeline
//! crates. Pull this crate in to get the whole retrieval-augmented answering stack from one place.
//!
//! ## What's inside?
//!
//! - [`EmbeddingModel`] and [`LanguageModel`], the two seams every component is written against.
//! - `rag`: corpus assembly, exact L2 retrieval and grounded answer generation.
//! - `sources`: the curated financial facts and the Edmonton open-data lookups.
//! - `openai` / `ort`: a hosted chat-completion client and a local ONNX sentence embedder.
//!
//! ## Example
//!
//! ```rust,ignore
//! use finrag::{openai::OpenAI, ort::OrtEmbedding, rag::{AnswerGenerator, CorpusBuilder, Retriever}};
//! use finrag::sources::curated_facts;
//!
//! async fn demo(api_key: &str) -> anyhow::Result<String> {
//!     let corpus = CorpusBuilder::new(curated_facts().iter().copied()).build().await;
//!     let retriever = Retriever::build(OrtEmbedding::from_directory("./models/all-MiniLM-L6-v2")?, corpus).await?;
//!     let generator = AnswerGenerator::new(OpenAI::new(api_key));
//!
//!     let question = "How can I diversify my portfolio?";
//!     let passages = retriever.retrieve(question, 2).await?;
//!     Ok(generator.generate(question, &passages).await?)
//! }
//! ```
//!
//! ## Modules
//!
//! - [`finrag_core::llm`] — chat messages, sampling parameters and the completion trait.
//! - [`finrag_core::embedding`] — convert text to vectors.

pub use finrag_core::*;

/// Chat completion provider.
#[cfg(feature = "openai")]
pub use finrag_openai as openai;

/// Local ONNX sentence embeddings.
#[cfg(feature = "ort")]
pub use finrag_ort as ort;

/// Retrieval and grounded generation.
#[cfg(feature = "rag")]
pub use finrag_rag as rag;

/// Curated facts and open-data knowledge sources.
#[cfg(feature = "sources")]
pub use finrag_sources as sources;
