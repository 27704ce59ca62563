//! Embedding gateway trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus pure helpers for vector serialization and distance computation.
//!
//! Concrete providers (OpenAI, Ollama, fastembed) live in the
//! `journal-harness` app crate.

use async_trait::async_trait;

use crate::error::{EngineError, Result};

/// Contract around an external embedding model.
///
/// Implementations must return one vector per input text, in input order,
/// with a fixed dimensionality, and must be deterministic for identical
/// input. Transport or model failures are reported as
/// [`EngineError::EmbeddingUnavailable`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality, or `0` if unknown
    /// until the first call.
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text.
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    embedder
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::EmbeddingUnavailable("empty embedding response".to_string()))
}

/// Encode a float vector as little-endian f32 bytes.
///
/// # Example
///
/// ```rust
/// use journal_harness_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes. Trailing bytes that do not form a
/// full `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Squared Euclidean distance between two vectors of equal length.
///
/// Matches the metric of a flat L2 index: smaller is nearer, `0.0` means
/// identical. Returns `f32::INFINITY` when the lengths differ.
pub fn l2_distance_sq(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(l2_distance_sq(&v, &v), 0.0);
    }

    #[test]
    fn test_l2_known_value() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((l2_distance_sq(&a, &b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_different_lengths() {
        assert!(l2_distance_sq(&[1.0, 2.0], &[1.0]).is_infinite());
    }

    #[test]
    fn test_blob_ignores_partial_tail() {
        let mut blob = vec_to_blob(&[1.5, -0.25]);
        blob.push(7);
        assert_eq!(blob_to_vec(&blob), vec![1.5, -0.25]);
    }
}
