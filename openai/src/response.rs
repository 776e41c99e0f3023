use serde::Deserialize;

use crate::OpenAIError;

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    /// Text of the first choice. A `null` content is treated as an empty answer.
    pub(crate) fn into_text(self) -> Result<String, OpenAIError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::Api("completion returned no choices".to_owned()))?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pulls `error.message` out of an `OpenAI` error body, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
        |_| body.trim().to_owned(),
        |envelope| envelope.error.message,
    )
}
