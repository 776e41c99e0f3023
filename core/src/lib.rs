//! # finrag-core
//!
//! `finrag-core` hosts the no-std trait APIs that the rest of the workspace builds on. Provider
//! crates implement these traits, and the retrieval pipeline only ever talks to them, so a local
//! ONNX embedder, a hosted chat-completion API, or a test stub can be swapped freely.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  finrag-rag     │───▶│   finrag-core    │◀───│   Providers     │
//! │                 │    │   (this crate)   │    │                 │
//! │ - Retriever     │    │ - EmbeddingModel │    │ - finrag-ort    │
//! │ - Generator     │    │ - LanguageModel  │    │ - finrag-openai │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! | Capability | Trait | Description |
//! |------------|-------|-------------|
//! | **Embeddings** | [`EmbeddingModel`] | Convert text to fixed-length vectors for nearest-neighbour search |
//! | **Language Models** | [`LanguageModel`] | Turn a system + user conversation into a single completion |
//!
//! ## Semantic Search with Embeddings
//!
//! ```rust
//! use finrag_core::EmbeddingModel;
//!
//! async fn embed_corpus(
//!     model: impl EmbeddingModel,
//!     passages: &[String],
//! ) -> finrag_core::Result<Vec<Vec<f32>>> {
//!     let matrix = model.embed_batch(passages).await?;
//!     assert!(matrix.iter().all(|row| row.len() == model.dim()));
//!     Ok(matrix)
//! }
//! ```
//!
//! ## Grounded Completion
//!
//! ```rust
//! use finrag_core::{LanguageModel, llm::{oneshot, model::Parameters}};
//!
//! async fn ask<M: LanguageModel>(model: &M) -> Result<String, M::Error> {
//!     let request = oneshot("You are a financial assistant.", "What is an ETF?")
//!         .with_parameters(Parameters::default().temperature(0.5).max_tokens(150));
//!     model.respond(request).await
//! }
//! ```

#![no_std]
extern crate alloc;

/// Text embeddings.
pub mod embedding;
pub mod llm;

#[doc(inline)]
pub use embedding::{Embedding, EmbeddingModel};
#[doc(inline)]
pub use llm::LanguageModel;

use alloc::string::String;

/// Result type used throughout the crate.
///
/// Type alias for [`anyhow::Result<T>`](anyhow::Result) with [`String`] as default success type.
pub type Result<T = String> = anyhow::Result<T>;

pub use anyhow::Error;
