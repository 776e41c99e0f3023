use finrag_core::llm::{Message, Role, model::Parameters};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessagePayload>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
}

impl ChatCompletionRequest {
    pub(crate) fn new(model: String, messages: &[Message], params: &Parameters) -> Self {
        Self {
            model,
            messages: to_chat_messages(messages),
            stream: false,
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
            stop: params.stop.clone(),
            seed: params.seed,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ChatMessagePayload {
    role: &'static str,
    content: String,
}

pub fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessagePayload> {
    messages
        .iter()
        .map(|message| ChatMessagePayload {
            role: match message.role() {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: message.content().to_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_non_streaming_request() {
        let messages = [Message::system("rules"), Message::user("question")];
        let params = Parameters::default().temperature(0.5).max_tokens(150);
        let request = ChatCompletionRequest::new("gpt-3.5-turbo".into(), &messages, &params);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "rules"},
                    {"role": "user", "content": "question"}
                ],
                "stream": false,
                "temperature": 0.5,
                "max_tokens": 150
            })
        );
    }
}
