use crate::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT,
    error::OpenAIError,
    request::ChatCompletionRequest,
    response::{ChatCompletionResponse, error_message},
};
use finrag_core::{
    LanguageModel,
    llm::LLMRequest,
};
use reqwest::{StatusCode, header};
use std::{future::Future, sync::Arc, time::Duration};

/// Configuration for request retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt number (0-indexed).
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Get retry delay for an error, respecting Retry-After header for rate limits.
fn get_retry_delay(err: &OpenAIError, attempt: u32, config: &RetryConfig) -> Duration {
    if let OpenAIError::RateLimit {
        retry_after: Some(delay),
        ..
    } = err
    {
        return (*delay).min(config.max_delay);
    }
    config.delay_for_attempt(attempt)
}

/// Run `make_request` until it succeeds, fails with a non-retryable error, or the retry
/// budget is spent.
async fn request_with_retry<T, F, Fut>(cfg: &Config, make_request: F) -> Result<T, OpenAIError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, OpenAIError>>,
{
    let retry_config = &cfg.retry;
    let mut attempt = 0;

    loop {
        match make_request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < retry_config.max_retries && err.is_retryable() {
                    let delay = get_retry_delay(&err, attempt, retry_config);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = retry_config.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "Completion request failed, retrying"
                    );
                    async_io::Timer::after(delay).await;
                    attempt += 1;
                } else {
                    return Err(err);
                }
            }
        }
    }
}

/// Chat Completions client.
///
/// Each call is a single non-streaming `POST {base_url}/chat/completions`.
///
/// ```no_run
/// use finrag_core::{LanguageModel, llm::{oneshot, model::Parameters}};
/// use finrag_openai::OpenAI;
///
/// # async fn demo() -> anyhow::Result<()> {
/// let model = OpenAI::new(std::env::var("OPENAI_API_KEY")?);
/// let request = oneshot("You are a financial assistant.", "What is an index fund?")
///     .with_parameters(Parameters::default().max_tokens(150).temperature(0.5));
/// println!("{}", model.respond(request).await?);
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct OpenAI {
    inner: Arc<Config>,
}

impl OpenAI {
    /// Create a new client using the provided API key and default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder(api_key).build()
    }

    /// Start building an [`OpenAI`] client with custom configuration.
    #[must_use]
    pub fn builder(api_key: impl Into<String>) -> Builder {
        Builder::new(api_key)
    }

    /// Returns the chat model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.chat_model
    }
}

impl LanguageModel for OpenAI {
    type Error = OpenAIError;

    fn respond(
        &self,
        request: LLMRequest,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send {
        let cfg = self.inner.clone();
        async move {
            let (messages, parameters) = request.into_parts();
            let body = ChatCompletionRequest::new(cfg.chat_model.clone(), &messages, &parameters);

            tracing::debug!(model = %cfg.chat_model, messages = messages.len(), "Sending chat completion request");

            let response = request_with_retry(&cfg, || chat_completion(&cfg, &body)).await?;
            response.into_text()
        }
    }
}

/// Make a chat completions request (single attempt).
async fn chat_completion(
    cfg: &Config,
    request: &ChatCompletionRequest,
) -> Result<ChatCompletionResponse, OpenAIError> {
    let response = cfg
        .http
        .post(cfg.request_url("/chat/completions"))
        .timeout(cfg.request_timeout)
        .header(header::AUTHORIZATION, cfg.request_auth())
        .header(header::USER_AGENT, "finrag-openai/0.1")
        .json(request)
        .send()
        .await?;
    let status = response.status();

    if status.is_success() {
        let text = response.text().await?;
        return Ok(serde_json::from_str(&text)?);
    }

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let message = error_message(&response.text().await.unwrap_or_default());

    if status == StatusCode::TOO_MANY_REQUESTS {
        Err(OpenAIError::RateLimit {
            message,
            retry_after,
        })
    } else {
        Err(OpenAIError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Builder for [`OpenAI`] clients.
#[derive(Debug, Clone)]
pub struct Builder {
    api_key: String,
    base_url: String,
    chat_model: String,
    retry: RetryConfig,
    request_timeout: Duration,
}

impl Builder {
    fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            chat_model: DEFAULT_MODEL.to_owned(),
            retry: RetryConfig::none(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set a custom API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Select a model identifier (e.g., `gpt-3.5-turbo`, `gpt-4o-mini`).
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = sanitize_model(model);
        self
    }

    /// Configure retry behavior for failed requests.
    ///
    /// By default requests are not retried. When enabled, retries happen on transport errors,
    /// timeouts and HTTP 429/500/502/503/504.
    #[must_use]
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Set maximum number of retry attempts, keeping the default backoff.
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.retry = RetryConfig {
            max_retries,
            ..RetryConfig::default()
        };
        self
    }

    /// Set the request timeout.
    ///
    /// Default is 10 seconds. The timeout covers connecting, sending and reading the response.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Consume the builder and create an [`OpenAI`] client.
    #[must_use]
    pub fn build(self) -> OpenAI {
        OpenAI {
            inner: Arc::new(Config {
                api_key: self.api_key,
                base_url: self.base_url,
                chat_model: self.chat_model,
                retry: self.retry,
                request_timeout: self.request_timeout,
                http: reqwest::Client::new(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct Config {
    api_key: String,
    base_url: String,
    chat_model: String,
    retry: RetryConfig,
    request_timeout: Duration,
    http: reqwest::Client,
}

impl Config {
    fn request_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request_auth(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

fn sanitize_model(model: impl Into<String>) -> String {
    model.into().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use finrag_core::llm::{model::Parameters, oneshot};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 1.0,
        }
    }

    #[test]
    fn backoff_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(20), Duration::from_secs(30));
    }

    #[test]
    fn builder_defaults() {
        let client = OpenAI::new("key");
        assert_eq!(client.model(), "gpt-3.5-turbo");
        assert_eq!(client.inner.retry, RetryConfig::none());
        assert_eq!(client.inner.request_timeout, Duration::from_secs(10));
        assert_eq!(
            client.inner.request_url("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn sends_grounded_request_and_reads_answer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-3.5-turbo",
                "stream": false,
                "max_tokens": 150,
                "temperature": 0.5,
                "messages": [
                    {"role": "system", "content": "rules"},
                    {"role": "user", "content": "What is a bond?"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"A bond is a loan."},"finish_reason":"stop"}]}"#,
            )
            .create_async()
            .await;

        let client = OpenAI::builder("test-key").base_url(server.url()).build();
        let request = oneshot("rules", "What is a bond?")
            .with_parameters(Parameters::default().max_tokens(150).temperature(0.5));

        let answer = client.respond(request).await.unwrap();
        assert_eq!(answer, "A bond is a loan.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_carries_upstream_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = OpenAI::builder("bad").base_url(server.url()).build();
        let err = client.respond(oneshot("s", "u")).await.unwrap_err();

        match err {
            OpenAIError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn no_retry_by_default() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("upstream unavailable")
            .expect(1)
            .create_async()
            .await;

        let client = OpenAI::builder("k").base_url(server.url()).build();
        let err = client.respond(oneshot("s", "u")).await.unwrap_err();

        assert!(matches!(err, OpenAIError::Status { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_rate_limits_when_enabled() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"slow down"}}"#)
            .expect(3)
            .create_async()
            .await;

        let client = OpenAI::builder("k")
            .base_url(server.url())
            .retry(fast_retry(2))
            .build();
        let err = client.respond(oneshot("s", "u")).await.unwrap_err();

        assert!(matches!(err, OpenAIError::RateLimit { ref message, .. } if message == "slow down"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn silent_upstream_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let client = OpenAI::builder("k")
            .base_url(format!("http://{addr}"))
            .timeout(Duration::from_millis(300))
            .build();
        let err = client.respond(oneshot("s", "u")).await.unwrap_err();

        assert!(matches!(err, OpenAIError::Timeout), "{err:?}");
        hold.abort();
    }

    #[tokio::test]
    async fn empty_choices_is_an_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = OpenAI::builder("k").base_url(server.url()).build();
        let err = client.respond(oneshot("s", "u")).await.unwrap_err();
        assert!(matches!(err, OpenAIError::Api(_)));
    }
}
