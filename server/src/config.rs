//! Command-line and environment configuration.
//!
//! Every flag falls back to an environment variable, and `main` loads `.env` before parsing, so
//! a checked-in `.env.example` is enough to run the service locally.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use finrag_rag::RagConfig;
use finrag_sources::OpenDataConfig;
use thiserror::Error;

/// Default chat endpoint used by `evaluate` and `chat`.
pub const DEFAULT_CHAT_URL: &str = "http://127.0.0.1:8000/chat/";

/// Retrieval-augmented financial assistant.
#[derive(Parser, Debug)]
#[command(name = "finrag", version, about)]
pub struct Cli {
    /// What to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the knowledge index and serve the chat API.
    Serve(ServeArgs),
    /// Score a running service's answers against the curated facts.
    Evaluate(EvaluateArgs),
    /// Talk to a running service from the terminal.
    Chat(ChatArgs),
}

/// Configuration problems that stop start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No completion API key was supplied.
    #[error("OpenAI API key is missing. Set OPENAI_API_KEY or pass --openai-api-key.")]
    MissingCredential,
}

/// Options for `finrag serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// API key for the chat completion service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = finrag_openai::OPENAI_BASE_URL)]
    pub openai_base_url: String,

    /// Chat model name.
    #[arg(long, env = "FINRAG_CHAT_MODEL", default_value = finrag_openai::GPT35_TURBO)]
    pub chat_model: String,

    /// Directory holding `model.onnx` and `tokenizer.json` of the sentence embedder.
    #[arg(long, env = "FINRAG_MODEL_DIR", default_value = "./models/all-MiniLM-L6-v2")]
    pub model_dir: PathBuf,

    /// Address to listen on.
    #[arg(long, env = "FINRAG_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Passages retrieved per question.
    #[arg(long, env = "FINRAG_TOP_K", default_value_t = 2)]
    pub top_k: usize,

    /// Completion length cap.
    #[arg(long, env = "FINRAG_MAX_TOKENS", default_value_t = 150)]
    pub max_tokens: u32,

    /// Completion sampling temperature.
    #[arg(long, env = "FINRAG_TEMPERATURE", default_value_t = 0.5)]
    pub temperature: f32,

    /// Completion request timeout in seconds.
    #[arg(long, env = "FINRAG_COMPLETION_TIMEOUT_SECS", default_value_t = 10)]
    pub completion_timeout_secs: u64,

    /// Retries for failed completion requests.
    #[arg(long, env = "FINRAG_COMPLETION_RETRIES", default_value_t = 0)]
    pub completion_retries: u32,

    /// Root of the Socrata open-data portal.
    #[arg(long, env = "FINRAG_OPEN_DATA_URL", default_value = "https://data.edmonton.ca")]
    pub open_data_url: String,

    /// Records fetched per dataset.
    #[arg(long, env = "FINRAG_RECORD_LIMIT", default_value_t = 5)]
    pub record_limit: u32,

    /// Per-dataset fetch timeout in seconds.
    #[arg(long, env = "FINRAG_FETCH_TIMEOUT_SECS", default_value_t = 5)]
    pub fetch_timeout_secs: u64,

    /// Skip the open-data sources and index only the curated facts.
    #[arg(long, env = "FINRAG_OFFLINE")]
    pub offline: bool,
}

impl ServeArgs {
    /// The completion API key.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingCredential`] if the key is absent or blank.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingCredential)
    }

    /// Retrieval and sampling settings.
    #[must_use]
    pub fn rag_config(&self) -> RagConfig {
        RagConfig::builder()
            .default_top_k(self.top_k)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build()
    }

    /// Open-data fetch settings.
    #[must_use]
    pub fn open_data_config(&self) -> OpenDataConfig {
        OpenDataConfig {
            base_url: self.open_data_url.clone(),
            limit: self.record_limit,
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    /// Completion request timeout.
    #[must_use]
    pub const fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }
}

/// Options for `finrag evaluate`.
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Chat endpoint of the running service.
    #[arg(long, env = "FINRAG_CHAT_URL", default_value = DEFAULT_CHAT_URL)]
    pub url: String,

    /// Directory holding the same sentence embedder the service uses.
    #[arg(long, env = "FINRAG_MODEL_DIR", default_value = "./models/all-MiniLM-L6-v2")]
    pub model_dir: PathBuf,

    /// Where to write the per-question results.
    #[arg(long, short, default_value = "chatbot_eval_results.csv")]
    pub output: PathBuf,
}

/// Options for `finrag chat`.
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Chat endpoint of the running service.
    #[arg(long, env = "FINRAG_CHAT_URL", default_value = DEFAULT_CHAT_URL)]
    pub url: String,
}
