//! Text embedding over a local sentence-embedding model.
//!
//! The concrete model is all-MiniLM-L6-v2 served through fastembed's ONNX
//! runtime. Output dimension is fixed at 384; vectors are L2-normalized at
//! generation time so cosine similarity reduces to a dot product.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;

use crate::processing::EngineError;
use crate::repository::errors::RepositoryResult;

/// Dimension of every vector produced by [`FastembedEncoder`].
pub const EMBEDDING_DIMENSION: usize = 384;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("input text is empty")]
    EmptyInput,

    #[error("embedding model failure: {0}")]
    Model(String),
}

/// Abstraction over the sentence-embedding model.
///
/// Implementations must be deterministic: identical input yields an
/// identical vector for the lifetime of the model version.
pub trait TextEncoder {
    /// Fixed output dimension of this encoder.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, preserving input order.
    ///
    /// Any text that is empty after trimming fails the whole batch.
    fn encode_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncodeError>;

    fn encode(&mut self, text: &str) -> Result<Vec<f32>, EncodeError> {
        let batch = self.encode_batch(&[text.to_string()])?;
        batch.into_iter().next().ok_or(EncodeError::EmptyInput)
    }
}

/// Reject input that is empty after trimming.
pub(crate) fn validate_text(text: &str) -> Result<&str, EncodeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EncodeError::EmptyInput);
    }
    Ok(trimmed)
}

/// Normalize a vector to unit length.
///
/// Returns the original vector when the norm is zero.
pub(crate) fn normalize_embedding(vec: &[f32]) -> Vec<f32> {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        vec.to_vec()
    } else {
        vec.iter().map(|x| x / norm).collect()
    }
}

/// Build the document text a profile is embedded from.
///
/// Joins name, title, research areas and the free-text description into a
/// short natural paragraph, skipping parts that are empty.
pub(crate) fn profile_document(
    name: &str,
    title: &str,
    areas: &[String],
    description: &str,
) -> String {
    let areas_text = areas.join(", ");

    let mut parts: Vec<String> = Vec::with_capacity(4);
    if !name.trim().is_empty() {
        parts.push(format!("{}.", name.trim()));
    }
    if !title.trim().is_empty() {
        parts.push(format!("{}.", title.trim()));
    }
    if !areas_text.is_empty() {
        parts.push(format!("Research areas: {areas_text}."));
    }
    if !description.trim().is_empty() {
        parts.push(format!("Research interests: {}", description.trim()));
    }

    parts.join(" ")
}

/// Reuse a persisted embedding when present, otherwise generate and persist
/// it through `persist`.
///
/// Returns the embedding and a flag indicating whether a new embedding was
/// generated.
pub(crate) fn load_or_generate_embedding<E, F>(
    existing: Option<&[f32]>,
    document: String,
    encoder: &mut E,
    persist: F,
) -> Result<(Vec<f32>, bool), EngineError>
where
    E: TextEncoder + ?Sized,
    F: FnOnce(&[f32]) -> RepositoryResult<usize>,
{
    if let Some(embedding) = existing {
        return Ok((embedding.to_vec(), false));
    }

    let generated = encoder.encode(&document)?;
    persist(&generated)?;

    Ok((generated, true))
}

/// Sentence encoder backed by fastembed's ONNX runtime.
pub struct FastembedEncoder {
    model: TextEmbedding,
}

impl FastembedEncoder {
    pub fn new() -> Result<Self, EncodeError> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|error| EncodeError::Model(format!("{error:?}")))?;
        Ok(Self { model })
    }
}

impl TextEncoder for FastembedEncoder {
    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }

    fn encode_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncodeError> {
        let cleaned = texts
            .iter()
            .map(|text| validate_text(text))
            .collect::<Result<Vec<&str>, EncodeError>>()?;

        let embeddings = self
            .model
            .embed(cleaned, None)
            .map_err(|error| EncodeError::Model(format!("{error:?}")))?;

        Ok(embeddings
            .iter()
            .map(|value| normalize_embedding(value))
            .collect())
    }
}
