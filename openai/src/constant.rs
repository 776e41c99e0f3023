//! Model & endpoint constants
//!
//! Only stable, non-snapshot chat model names are listed. Any other identifier can be passed
//! as a plain string.

/// Default `OpenAI` API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Fast, inexpensive chat model. This is what the assistant answers with by default.
pub const GPT35_TURBO: &str = "gpt-3.5-turbo";

/// Cheapest small multimodal model.
pub const GPT4O_MINI: &str = "gpt-4o-mini";

