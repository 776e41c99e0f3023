//! Chat Completions integration for finrag built on `reqwest` and the shared `finrag-core`
//! abstractions.
//!
//! [`OpenAI`] implements [`finrag_core::LanguageModel`] against any OpenAI-compatible
//! `/chat/completions` endpoint. Requests are non-streaming, bounded by a timeout, and are not
//! retried unless a [`RetryConfig`] says so.
//!
//! ```no_run
//! use finrag_core::{LanguageModel, llm::oneshot};
//! use finrag_openai::{OpenAI, GPT4O_MINI};
//! use std::time::Duration;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let model = OpenAI::builder(std::env::var("OPENAI_API_KEY")?)
//!     .model(GPT4O_MINI)
//!     .timeout(Duration::from_secs(20))
//!     .build();
//!
//! let answer = model
//!     .respond(oneshot("You are a concise assistant.", "What is diversification?"))
//!     .await?;
//! println!("{answer}");
//! # Ok(()) }
//! ```

mod client;
mod error;
mod request;
mod response;

pub use client::{Builder, OpenAI, RetryConfig};
pub use error::OpenAIError;

mod constant;
pub use constant::*;

use std::time::Duration;

pub(crate) const DEFAULT_MODEL: &str = GPT35_TURBO;
pub(crate) const DEFAULT_BASE_URL: &str = OPENAI_BASE_URL;
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
