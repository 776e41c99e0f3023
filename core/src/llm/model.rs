//! Sampling parameters for language model calls.

use alloc::{string::String, vec::Vec};

/// Sampling parameters attached to an [`LLMRequest`](super::LLMRequest).
///
/// Every field is optional; `None` leaves the provider default in place.
///
/// ```rust
/// use finrag_core::llm::model::Parameters;
///
/// let params = Parameters::default().temperature(0.5).max_tokens(150);
/// assert_eq!(params.max_tokens, Some(150));
/// assert_eq!(params.top_p, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct Parameters {
    /// Sampling temperature.
    ///
    /// Lower values make answers more focused and deterministic.
    pub temperature: Option<f32>,
    /// Nucleus sampling probability mass.
    pub top_p: Option<f32>,
    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,
    /// Seed for providers that support reproducible sampling.
    pub seed: Option<u32>,
    /// Stop sequences to end generation.
    pub stop: Option<Vec<String>>,
}

macro_rules! impl_with_methods {
    (
        impl $ty:ty {
            $($field:ident : $field_ty:ty),* $(,)?
        }
    ) => {
        impl $ty {
            $(
                /// Sets the parameter value using a builder pattern.
                #[allow(clippy::missing_const_for_fn)]
                #[must_use] pub fn $field(mut self, value: $field_ty) -> Self {
                    self.$field = Some(value);
                    self
                }
            )*
        }
    };
}

impl_with_methods! {
    impl Parameters {
        temperature: f32,
        top_p: f32,
        max_tokens: u32,
        seed: u32,
        stop: Vec<String>,
    }
}
