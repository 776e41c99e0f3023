//! Local ONNX Runtime sentence embeddings for finrag.
//!
//! This crate provides [`OrtEmbedding`], an implementation of [`finrag_core::EmbeddingModel`]
//! that runs a sentence-transformer export (by default `all-MiniLM-L6-v2`) locally using ONNX
//! Runtime and a Hugging Face `tokenizer.json`.
//!
//! # Features
//!
//! - **No auto-download**: You provide the model directory
//! - **Auto-detect dimension**: Embedding dimension is detected from model outputs
//! - **Batch inference**: [`embed_batch`](finrag_core::EmbeddingModel::embed_batch) runs one padded batch
//! - **Off the async runtime**: inference runs on Tokio's blocking pool
//!
//! # Example
//!
//! ```rust,no_run
//! use finrag_ort::OrtEmbedding;
//! use finrag_core::EmbeddingModel;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = OrtEmbedding::from_directory("./models/all-MiniLM-L6-v2")?;
//! assert_eq!(embedder.dim(), 384);
//!
//! let embedding = embedder.embed("What is a bond?").await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod pooling;

pub use error::OrtError;
pub use pooling::PoolingStrategy;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use finrag_core::EmbeddingModel;
use ndarray::Ix3;
use ort::session::{Session, builder::GraphOptimizationLevel};
use tokenizers::Tokenizer;

/// An embedding model backed by ONNX Runtime.
///
/// Cloning is cheap; clones share the same session.
///
/// ```rust,no_run
/// use finrag_ort::{OrtEmbedding, PoolingStrategy};
///
/// let embedder = OrtEmbedding::builder()
///     .model_path("./model/model.onnx")
///     .tokenizer_path("./model/tokenizer.json")
///     .pooling(PoolingStrategy::Cls)
///     .build()?;
/// # Ok::<(), finrag_ort::OrtError>(())
/// ```
#[derive(Clone)]
pub struct OrtEmbedding {
    inner: Arc<Inner>,
}

struct Inner {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
    pooling: PoolingStrategy,
    normalize: bool,
    token_type_ids: bool,
}

impl std::fmt::Debug for OrtEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtEmbedding")
            .field("dimension", &self.inner.dimension)
            .field("pooling", &self.inner.pooling)
            .field("normalize", &self.inner.normalize)
            .finish_non_exhaustive()
    }
}

impl OrtEmbedding {
    /// Load an embedding model from a directory.
    ///
    /// Locates `model.onnx` (or a file in the `onnx/` subdirectory) and `tokenizer.json`,
    /// then builds with mean pooling and L2 normalisation.
    ///
    /// # Errors
    /// Returns an error if the model or tokenizer cannot be found or loaded.
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, OrtError> {
        let dir = path.as_ref();
        let model_path = find_model_file(dir)?;
        let tokenizer_path = find_tokenizer_file(dir)?;

        Self::builder()
            .model_path(model_path)
            .tokenizer_path(tokenizer_path)
            .build()
    }

    /// Create a builder for custom configuration.
    #[must_use]
    pub fn builder() -> OrtEmbeddingBuilder {
        OrtEmbeddingBuilder::default()
    }

    /// Returns the embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.inner.dimension
    }

    /// Returns the pooling strategy.
    #[must_use]
    pub fn pooling(&self) -> PoolingStrategy {
        self.inner.pooling
    }

    /// Returns whether L2 normalization is enabled.
    #[must_use]
    pub fn normalize(&self) -> bool {
        self.inner.normalize
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, OrtError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.encode(&texts)).await?
    }
}

impl Inner {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OrtError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| OrtError::Tokenization(e.to_string()))?;

        let batch = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|encoding| encoding.get_ids().len())
            .max()
            .unwrap_or(0);

        // Right-pad every sequence to the longest one; pad id 0 with mask 0.
        let mut input_ids = vec![0_i64; batch * seq_len];
        let mut attention_mask = vec![0_i64; batch * seq_len];
        let mut type_ids = vec![0_i64; batch * seq_len];
        let mut masks = vec![vec![0_u32; seq_len]; batch];

        for (row, encoding) in encodings.iter().enumerate() {
            let tokens = encoding
                .get_ids()
                .iter()
                .zip(encoding.get_attention_mask())
                .zip(encoding.get_type_ids());
            for (col, ((&id, &mask), &type_id)) in tokens.enumerate() {
                let offset = row * seq_len + col;
                input_ids[offset] = i64::from(id);
                attention_mask[offset] = i64::from(mask);
                type_ids[offset] = i64::from(type_id);
                masks[row][col] = mask;
            }
        }

        let input_ids_tensor =
            ort::value::Tensor::from_array(([batch, seq_len], input_ids.into_boxed_slice()))?;
        let attention_mask_tensor =
            ort::value::Tensor::from_array(([batch, seq_len], attention_mask.into_boxed_slice()))?;

        let hidden_states = {
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            let outputs = if self.token_type_ids {
                let type_ids_tensor =
                    ort::value::Tensor::from_array(([batch, seq_len], type_ids.into_boxed_slice()))?;
                session.run(ort::inputs![
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor,
                    "token_type_ids" => type_ids_tensor,
                ])?
            } else {
                session.run(ort::inputs![
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor,
                ])?
            };

            let hidden_states = outputs
                .get("last_hidden_state")
                .or_else(|| outputs.get("token_embeddings"))
                .or_else(|| outputs.get("output"))
                .ok_or(OrtError::HiddenStateRank(0))?;

            hidden_states.try_extract_array::<f32>()?.to_owned()
        };

        let rank = hidden_states.shape().len();
        if rank != 3 {
            return Err(OrtError::HiddenStateRank(rank));
        }

        let hidden_states = hidden_states
            .into_dimensionality::<Ix3>()
            .map_err(|e| OrtError::BatchShape(e.to_string()))?;

        let view = hidden_states.view();
        let rows = masks
            .iter()
            .enumerate()
            .map(|(row, mask)| {
                let mut embedding = self.pooling.apply(&view, row, mask);
                if self.normalize {
                    l2_normalize(&mut embedding);
                }
                embedding
            })
            .collect();

        Ok(rows)
    }
}

impl EmbeddingModel for OrtEmbedding {
    fn dim(&self) -> usize {
        self.inner.dimension
    }

    async fn embed(&self, text: &str) -> finrag_core::Result<Vec<f32>> {
        let mut rows = self.run(vec![text.to_owned()]).await?;
        let embedding = rows
            .pop()
            .ok_or_else(|| OrtError::BatchShape("model returned an empty batch".to_owned()))?;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> finrag_core::Result<Vec<Vec<f32>>> {
        Ok(self.run(texts.to_vec()).await?)
    }
}

/// Builder for [`OrtEmbedding`].
#[derive(Debug)]
pub struct OrtEmbeddingBuilder {
    model_path: Option<PathBuf>,
    tokenizer_path: Option<PathBuf>,
    pooling: PoolingStrategy,
    normalize: bool,
}

impl Default for OrtEmbeddingBuilder {
    fn default() -> Self {
        Self {
            model_path: None,
            tokenizer_path: None,
            pooling: PoolingStrategy::Mean,
            normalize: true,
        }
    }
}

impl OrtEmbeddingBuilder {
    /// Set the path to the ONNX model file.
    #[must_use]
    pub fn model_path(mut self, path: impl AsRef<Path>) -> Self {
        self.model_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the path to the tokenizer.json file.
    #[must_use]
    pub fn tokenizer_path(mut self, path: impl AsRef<Path>) -> Self {
        self.tokenizer_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the pooling strategy.
    ///
    /// Default: [`PoolingStrategy::Mean`]
    #[must_use]
    pub const fn pooling(mut self, strategy: PoolingStrategy) -> Self {
        self.pooling = strategy;
        self
    }

    /// Enable or disable L2 normalization.
    ///
    /// Default: `true`
    #[must_use]
    pub const fn normalize(mut self, enabled: bool) -> Self {
        self.normalize = enabled;
        self
    }

    /// Build the [`OrtEmbedding`] instance.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Model path is not specified
    /// - Model file cannot be loaded
    /// - Tokenizer file cannot be loaded
    /// - Model output dimension cannot be determined
    pub fn build(self) -> Result<OrtEmbedding, OrtError> {
        let model_path = self.model_path.ok_or(OrtError::MissingModelPath)?;

        if !model_path.exists() {
            return Err(OrtError::ModelNotFound(model_path));
        }

        let tokenizer_path = match self.tokenizer_path {
            Some(path) => path,
            None => find_tokenizer_file(model_path.parent().unwrap_or(&model_path))?,
        };

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| OrtError::tokenizer_load(&tokenizer_path, e))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(num_cpus())?
            .commit_from_file(&model_path)?;

        let dimension = detect_embedding_dimension(&session)?;
        let token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        Ok(OrtEmbedding {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                tokenizer,
                dimension,
                pooling: self.pooling,
                normalize: self.normalize,
                token_type_ids,
            }),
        })
    }
}

/// L2 normalize a vector in place.
fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

fn find_onnx_in(dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().is_some_and(|ext| ext == "onnx"))
}

/// Find the ONNX model file in a directory.
fn find_model_file(dir: &Path) -> Result<PathBuf, OrtError> {
    let candidates = [
        dir.join("model.onnx"),
        dir.join("onnx/model.onnx"),
        dir.join("onnx/model_fp32.onnx"),
        dir.join("onnx/model_quantized.onnx"),
    ];

    if let Some(found) = candidates.iter().find(|candidate| candidate.exists()) {
        return Ok(found.clone());
    }

    find_onnx_in(dir)
        .or_else(|| find_onnx_in(&dir.join("onnx")))
        .ok_or_else(|| OrtError::ModelNotFound(dir.to_path_buf()))
}

/// Find the tokenizer.json file in a directory.
fn find_tokenizer_file(dir: &Path) -> Result<PathBuf, OrtError> {
    [dir.join("tokenizer.json"), dir.join("onnx/tokenizer.json")]
        .into_iter()
        .find(|candidate| candidate.exists())
        .ok_or_else(|| OrtError::TokenizerNotFound(dir.to_path_buf()))
}

/// Detect the embedding dimension from model output metadata.
fn detect_embedding_dimension(session: &Session) -> Result<usize, OrtError> {
    for output in session.outputs() {
        // [batch, seq_len, hidden_dim] or [batch, hidden_dim]
        if let ort::value::ValueType::Tensor { shape, .. } = output.dtype() {
            if shape.len() >= 2 {
                if let Some(&dim) = shape.last() {
                    if dim > 0 {
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        return Ok(dim as usize);
                    }
                }
            }
        }
    }

    Err(OrtError::HiddenStateRank(0))
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(4)
}
