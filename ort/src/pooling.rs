//! Pooling strategies for extracting embeddings from transformer outputs.

use ndarray::ArrayView3;

/// Strategy for pooling hidden states into a single embedding vector.
///
/// Different embedding models require different pooling strategies:
/// - Sentence-transformer encoders (`all-MiniLM-L6-v2`) use [`Mean`](PoolingStrategy::Mean)
/// - Classic BERT setups use [`Cls`](PoolingStrategy::Cls)
/// - Decoder embedding models use [`LastToken`](PoolingStrategy::LastToken)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PoolingStrategy {
    /// Average all non-padding token hidden states.
    ///
    /// This is what sentence-transformers does for MiniLM, so it is the default.
    #[default]
    Mean,

    /// Use the first token's hidden state (typically [CLS] token).
    Cls,

    /// Use the last non-padding token's hidden state.
    LastToken,
}

impl PoolingStrategy {
    /// Apply the pooling strategy to one row of a batch.
    ///
    /// # Arguments
    /// * `hidden_states` - Tensor of shape `[batch, seq_len, hidden_dim]`
    /// * `row` - Which batch entry to pool
    /// * `attention_mask` - Mask for that row, 1 for real tokens and 0 for padding
    ///
    /// # Returns
    /// A vector of `hidden_dim` floats representing the pooled embedding.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn apply(
        &self,
        hidden_states: &ArrayView3<f32>,
        row: usize,
        attention_mask: &[u32],
    ) -> Vec<f32> {
        let seq_len = hidden_states.shape()[1];
        let hidden_dim = hidden_states.shape()[2];

        match self {
            Self::Mean => {
                let valid_count = attention_mask.iter().filter(|&&m| m != 0).count();
                if valid_count == 0 {
                    return vec![0.0; hidden_dim];
                }

                let mut result = vec![0.0; hidden_dim];
                for (seq_idx, _) in attention_mask
                    .iter()
                    .enumerate()
                    .take(seq_len)
                    .filter(|(_, m)| **m != 0)
                {
                    for (d, value) in result.iter_mut().enumerate() {
                        *value += hidden_states[[row, seq_idx, d]];
                    }
                }

                let count = valid_count as f32;
                for value in &mut result {
                    *value /= count;
                }

                result
            }
            Self::Cls => (0..hidden_dim)
                .map(|d| hidden_states[[row, 0, d]])
                .collect(),
            Self::LastToken => {
                let last_idx = attention_mask
                    .iter()
                    .take(seq_len)
                    .rposition(|&m| m != 0)
                    .unwrap_or(seq_len.saturating_sub(1));

                (0..hidden_dim)
                    .map(|d| hidden_states[[row, last_idx, d]])
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn batch() -> Array3<f32> {
        // [2, 3, 2]: two sequences of three tokens
        Array3::from_shape_vec(
            (2, 3, 2),
            vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, // row 0
                10.0, 20.0, 30.0, 40.0, 0.0, 0.0, // row 1, last token is padding
            ],
        )
        .unwrap()
    }

    #[test]
    fn mean_pooling_ignores_padding() {
        let hidden = batch();
        let result = PoolingStrategy::Mean.apply(&hidden.view(), 1, &[1, 1, 0]);
        assert_eq!(result, vec![20.0, 30.0]);
    }

    #[test]
    fn mean_pooling_full_row() {
        let hidden = batch();
        let result = PoolingStrategy::Mean.apply(&hidden.view(), 0, &[1, 1, 1]);
        assert_eq!(result, vec![3.0, 4.0]);
    }

    #[test]
    fn mean_pooling_all_masked_is_zero() {
        let hidden = batch();
        let result = PoolingStrategy::Mean.apply(&hidden.view(), 0, &[0, 0, 0]);
        assert_eq!(result, vec![0.0, 0.0]);
    }

    #[test]
    fn cls_pooling_takes_first_token() {
        let hidden = batch();
        assert_eq!(
            PoolingStrategy::Cls.apply(&hidden.view(), 1, &[1, 1, 0]),
            vec![10.0, 20.0]
        );
    }

    #[test]
    fn last_token_skips_padding() {
        let hidden = batch();
        assert_eq!(
            PoolingStrategy::LastToken.apply(&hidden.view(), 1, &[1, 1, 0]),
            vec![30.0, 40.0]
        );
        assert_eq!(
            PoolingStrategy::LastToken.apply(&hidden.view(), 0, &[1, 1, 1]),
            vec![5.0, 6.0]
        );
    }
}
