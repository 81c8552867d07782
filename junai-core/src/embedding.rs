use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;

pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Maps keywords to a fixed-length vector.
///
/// Implementations must return vectors of `dimension()` length on every call,
/// otherwise vector-store comparisons are meaningless.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, keywords: &[String]) -> Result<Vec<f32>>;
}

/// Deterministic feature-hashing embedding.
///
/// Every alphanumeric token is hashed with SHA-256: the first 8 bytes choose the
/// bucket, the 9th byte the sign. The accumulated vector is L2-normalised, so
/// identical keyword sets always produce identical vectors.
#[derive(Debug, Clone)]
pub struct HashingEmbedding {
    dimension: usize,
}

impl HashingEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn tokens(keywords: &[String]) -> impl Iterator<Item = String> + '_ {
        keywords.iter().flat_map(|keyword| {
            keyword
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
                .map(|t| t.to_lowercase())
                .collect::<Vec<_>>()
        })
    }

    fn embed_sync(&self, keywords: &[String]) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in Self::tokens(keywords) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedding {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

#[async_trait]
impl EmbeddingService for HashingEmbedding {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, keywords: &[String]) -> Result<Vec<f32>> {
        Ok(self.embed_sync(keywords))
    }
}
