//! Task embeddings with a deterministic offline fallback

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::warn;

use peanut_gateway::Gateway;

/// Dimension of the hash fallback embedding
pub const FALLBACK_DIM: usize = 128;

/// Deterministic, network-free embedding over whitespace tokens.
///
/// Each token hashes to one bucket with a hash-derived sign; the vector is
/// L2-normalized and quantized to 4 decimals. Identical text always yields
/// a bit-identical vector.
pub fn hash_embedding(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0f32; dim];

    for token in text.to_lowercase().split_whitespace() {
        let digest = Sha256::digest(token.as_bytes());
        let bucket =
            u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize % dim;
        let sign = if digest[4] % 2 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }

    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    for x in vector.iter_mut() {
        *x = (*x * 10_000.0).round() / 10_000.0;
    }

    vector
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Embeds task text via the gateway, falling back to [`hash_embedding`]
/// whenever the gateway is unavailable or returns the wrong dimension
pub struct Embedder {
    gateway: Option<Arc<dyn Gateway>>,
    dim: usize,
}

impl Embedder {
    pub fn new(gateway: Arc<dyn Gateway>, dim: usize) -> Self {
        Self {
            gateway: Some(gateway),
            dim,
        }
    }

    /// Fallback-only embedder; never touches the network
    pub fn offline(dim: usize) -> Self {
        Self { gateway: None, dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub async fn embed(&self, text: &str) -> Vec<f32> {
        if let Some(gateway) = &self.gateway {
            match gateway.embed(text).await {
                Ok(vector) if vector.len() == self.dim => return vector,
                Ok(vector) => warn!(
                    "gateway embedding dimension {} != store dimension {}, using fallback",
                    vector.len(),
                    self.dim
                ),
                Err(e) => warn!("gateway embedding failed, using fallback: {}", e),
            }
        }
        hash_embedding(text, self.dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedding_deterministic() {
        let a = hash_embedding("list files in workspace", FALLBACK_DIM);
        let b = hash_embedding("list files in workspace", FALLBACK_DIM);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_embedding_dimension_and_norm() {
        let v = hash_embedding("some task text", FALLBACK_DIM);
        assert_eq!(v.len(), FALLBACK_DIM);

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_hash_embedding_empty_text_is_zero() {
        let v = hash_embedding("", FALLBACK_DIM);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_hash_embedding_case_insensitive() {
        assert_eq!(
            hash_embedding("List Files", FALLBACK_DIM),
            hash_embedding("list files", FALLBACK_DIM)
        );
    }

    #[test]
    fn test_cosine_reflexive() {
        let v = hash_embedding("check disk space", FALLBACK_DIM);
        assert!((cosine(&v, &v) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine(&[1.0, 0.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_offline_embedder_uses_fallback() {
        let embedder = Embedder::offline(FALLBACK_DIM);
        let v = embedder.embed("hello world").await;
        assert_eq!(v, hash_embedding("hello world", FALLBACK_DIM));
    }
}
