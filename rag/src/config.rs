//! Configuration for retrieval and answer generation.

/// Tunables shared by the retriever and the answer generator.
#[derive(Debug, Clone, PartialEq)]
pub struct RagConfig {
    /// Number of passages retrieved per query.
    pub default_top_k: usize,
    /// Completion length cap.
    pub max_tokens: u32,
    /// Completion sampling temperature.
    pub temperature: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            default_top_k: 2,
            max_tokens: 150,
            temperature: 0.5,
        }
    }
}

impl RagConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::new()
    }
}

/// Builder for RAG configuration.
#[derive(Debug, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RagConfig::default(),
        }
    }

    /// Sets the number of passages to retrieve.
    #[must_use]
    pub const fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    /// Sets the completion token cap.
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Sets the completion temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RagConfig {
        self.config
    }
}
