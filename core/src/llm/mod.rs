//! # Language Models and Conversation Management
//!
//! Provider-agnostic chat completion. A provider crate implements [`LanguageModel`], and callers
//! hand it an [`LLMRequest`] made of [`Message`]s plus sampling [`Parameters`](model::Parameters).
//!
//! ## Quick Start
//!
//! ```rust
//! use finrag_core::llm::{LanguageModel, LLMRequest, Message, model::Parameters};
//!
//! async fn ask<M: LanguageModel>(model: &M) -> Result<String, M::Error> {
//!     let request = LLMRequest::new([
//!         Message::system("You are a financial assistant"),
//!         Message::user("What is compound interest?"),
//!     ])
//!     .with_parameters(Parameters::default().max_tokens(150));
//!
//!     model.respond(request).await
//! }
//! ```

/// Message types and conversation handling.
pub mod message;
/// Sampling parameters.
pub mod model;

use crate::llm::model::Parameters;
use alloc::{boxed::Box, string::String, sync::Arc, vec, vec::Vec};
use core::future::Future;
pub use message::{Message, Role};

/// Builder-style request passed into [`LanguageModel::respond`].
///
/// Wraps the full conversation and the sampling parameters a provider needs in order to
/// execute a call.
#[derive(Debug, Clone, PartialEq)]
pub struct LLMRequest {
    messages: Vec<Message>,
    parameters: Parameters,
}

impl LLMRequest {
    /// Creates a request from the provided messages using default parameters.
    pub fn new(messages: impl Into<Vec<Message>>) -> Self {
        Self {
            messages: messages.into(),
            parameters: Parameters::default(),
        }
    }

    /// Overrides the sampling parameters used for this call.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Returns the current conversation messages.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the current parameter snapshot.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Breaks the request into owned components for providers that want to take ownership.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Message>, Parameters) {
        (self.messages, self.parameters)
    }
}

/// Language models for text generation.
///
/// Responses are returned whole; there is no token streaming.
pub trait LanguageModel: Sized + Send + Sync {
    /// The error type returned by this language model.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Generates the assistant reply for a conversation.
    fn respond(&self, request: LLMRequest) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

macro_rules! impl_language_model {
    ($($name:ident),*) => {
        $(
            impl<T: LanguageModel> LanguageModel for $name<T> {
                type Error = T::Error;

                fn respond(
                    &self,
                    request: LLMRequest,
                ) -> impl Future<Output = Result<String, Self::Error>> + Send {
                    T::respond(self, request)
                }
            }
        )*
    };
}

impl<T: LanguageModel> LanguageModel for &T {
    type Error = T::Error;

    fn respond(&self, request: LLMRequest) -> impl Future<Output = Result<String, Self::Error>> + Send {
        T::respond(self, request)
    }
}

impl_language_model!(Arc, Box);

/// Convenience helper that creates a single system + user [`LLMRequest`].
pub fn oneshot(system: impl Into<String>, user: impl Into<String>) -> LLMRequest {
    let messages = vec![Message::system(system.into()), Message::user(user.into())];
    LLMRequest::new(messages)
}
