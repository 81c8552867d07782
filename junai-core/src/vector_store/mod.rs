//! Vector store collaborator interface and its adapters.
//!
//! - [`InMemoryVectorStore`]: non-persistent store for local dev and tests
//! - [`QdrantVectorStore`]: Qdrant-backed store for production
//!
//! Adapters report every backend failure as `StoreUnavailable`.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

mod in_memory;
mod qdrant;

pub use in_memory::InMemoryVectorStore;
pub use qdrant::QdrantVectorStore;

/// Nearest-neighbour query scoped to a single user.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    pub user_id: String,
    pub vector: Vec<f32>,
    pub top_k: usize,
}

/// One hit, in the store's relevance order.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub content: String,
    pub score: f32,
}

/// A record to index. `content` is the searchable text; `data` the full payload.
///
/// `key` is the storage identity: inserting a record whose key is already
/// stored replaces it, so a retried insert never adds a second copy.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub key: Uuid,
    pub id: String,
    pub user_id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub data: Value,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns at most `top_k` matches for `user_id`, most relevant first.
    async fn query(&self, query: &VectorQuery) -> Result<Vec<VectorMatch>>;

    /// Durably stores one record, replacing any record with the same `key`.
    async fn insert(&self, record: VectorRecord) -> Result<()>;
}
