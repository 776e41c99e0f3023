//! Grounded answer generation.

use finrag_core::{
    LanguageModel,
    llm::{model::Parameters, oneshot},
};

use crate::config::RagConfig;
use crate::error::GenerateError;
use crate::prompt::{NO_MATCH_MESSAGE, SYSTEM_PROMPT, build_prompt};

/// Turns a question plus retrieved passages into a single completion call.
#[derive(Debug)]
pub struct AnswerGenerator<L: LanguageModel> {
    model: L,
    parameters: Parameters,
}

impl<L: LanguageModel> AnswerGenerator<L> {
    /// Uses the default sampling (150 tokens, temperature 0.5).
    pub fn new(model: L) -> Self {
        Self::with_config(model, &RagConfig::default())
    }

    /// Takes sampling parameters from `config`.
    pub fn with_config(model: L, config: &RagConfig) -> Self {
        Self {
            model,
            parameters: Parameters::default()
                .max_tokens(config.max_tokens)
                .temperature(config.temperature),
        }
    }

    /// The sampling parameters sent with every request.
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Produces an answer grounded on `retrieved`.
    ///
    /// With nothing retrieved the model is not called and [`NO_MATCH_MESSAGE`] is returned.
    ///
    /// # Errors
    /// Returns [`GenerateError::Upstream`] when the completion call fails. No retry happens here.
    pub async fn generate<S: AsRef<str> + Sync>(
        &self,
        query: &str,
        retrieved: &[S],
    ) -> Result<String, GenerateError> {
        if retrieved.is_empty() {
            return Ok(NO_MATCH_MESSAGE.to_owned());
        }

        let request = oneshot(SYSTEM_PROMPT, build_prompt(query, retrieved))
            .with_parameters(self.parameters.clone());

        match self.model.respond(request).await {
            Ok(answer) => Ok(answer.trim().to_owned()),
            Err(error) => {
                tracing::error!(error = %error, "Completion request failed");
                Err(GenerateError::Upstream(Box::new(error)))
            }
        }
    }
}
