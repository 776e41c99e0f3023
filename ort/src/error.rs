//! Failures of the local sentence embedder.

use std::path::PathBuf;
use thiserror::Error;

/// Why the embedder could not be loaded or could not embed a batch.
#[derive(Debug, Error)]
pub enum OrtError {
    /// ONNX Runtime rejected the session or the inference call.
    #[error("onnx runtime: {0}")]
    Ort(#[from] ort::Error),

    /// `tokenizer.json` exists but could not be parsed.
    #[error("cannot read tokenizer {path}: {message}")]
    TokenizerLoad {
        /// File that failed to load.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The builder was finished without a model path.
    #[error("no model path given")]
    MissingModelPath,

    /// No `tokenizer.json` next to the model.
    #[error("no tokenizer.json in {0}; download the MiniLM export alongside model.onnx")]
    TokenizerNotFound(PathBuf),

    /// No `.onnx` file at the given location.
    #[error("no ONNX model at {0}; download the MiniLM export first")]
    ModelNotFound(PathBuf),

    /// The model output is not `[batch, tokens, hidden]`.
    #[error("hidden states have rank {0}, expected 3")]
    HiddenStateRank(usize),

    /// A passage in the batch could not be tokenized.
    #[error("cannot tokenize batch: {0}")]
    Tokenization(String),

    /// Padded input or pooled output had an inconsistent shape.
    #[error("batch shape: {0}")]
    BatchShape(String),

    /// The blocking inference task panicked or was cancelled.
    #[error("embedding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl OrtError {
    pub(crate) fn tokenizer_load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::TokenizerLoad {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
