use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{VectorMatch, VectorQuery, VectorRecord, VectorStore};
use crate::error::{NavigationError, Result};

/// A simple, non-persistent store.
///
/// Ranks by cosine similarity; equal scores keep insertion order so repeated
/// queries over unchanged state return identical results.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorStore {
    records: Arc<RwLock<Vec<VectorRecord>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored so far, in insertion order.
    pub async fn records(&self) -> Vec<VectorRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(&self, query: &VectorQuery) -> Result<Vec<VectorMatch>> {
        tracing::debug!(
            user_id = %query.user_id,
            top_k = query.top_k,
            "Querying in-memory vector store"
        );

        let store = self.records.read().await;
        let mut scored = Vec::new();
        for record in store.iter().filter(|r| r.user_id == query.user_id) {
            if record.vector.len() != query.vector.len() {
                return Err(NavigationError::store(
                    "query",
                    format!(
                        "vector dimension mismatch: stored {} vs query {}",
                        record.vector.len(),
                        query.vector.len()
                    ),
                ));
            }
            scored.push(VectorMatch {
                content: record.content.clone(),
                score: cosine(&record.vector, &query.vector),
            });
        }

        // sort_by is stable: ties stay in insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(query.top_k);
        Ok(scored)
    }

    async fn insert(&self, record: VectorRecord) -> Result<()> {
        tracing::debug!(
            record_id = %record.id,
            user_id = %record.user_id,
            "Storing record in in-memory vector store"
        );
        let mut store = self.records.write().await;
        match store.iter_mut().find(|r| r.key == record.key) {
            Some(existing) => *existing = record,
            None => store.push(record),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn record(id: &str, user: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord {
            key: Uuid::new_v4(),
            id: id.to_string(),
            user_id: user.to_string(),
            vector,
            content: format!("content {}", id),
            data: json!({}),
        }
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity_and_scopes_by_user() {
        let store = InMemoryVectorStore::new();
        store.insert(record("a", "u1", vec![0.0, 1.0])).await.unwrap();
        store.insert(record("b", "u1", vec![1.0, 0.0])).await.unwrap();
        store.insert(record("c", "u2", vec![1.0, 0.0])).await.unwrap();

        let hits = store
            .query(&VectorQuery {
                user_id: "u1".to_string(),
                vector: vec![1.0, 0.1],
                top_k: 5,
            })
            .await
            .unwrap();

        let contents: Vec<_> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, vec!["content b", "content a"]);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order_and_top_k_truncates() {
        let store = InMemoryVectorStore::new();
        for id in ["1", "2", "3"] {
            store.insert(record(id, "u1", vec![1.0, 0.0])).await.unwrap();
        }

        let query = VectorQuery {
            user_id: "u1".to_string(),
            vector: vec![1.0, 0.0],
            top_k: 2,
        };
        let first = store.query(&query).await.unwrap();
        let second = store.query(&query).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first[0].content, "content 1");
        assert_eq!(first[1].content, "content 2");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_insert_with_same_key_replaces() {
        let store = InMemoryVectorStore::new();
        let first = record("a", "u1", vec![1.0, 0.0]);
        let mut again = first.clone();
        again.content = "content a (retried)".to_string();

        store.insert(first).await.unwrap();
        store.insert(again).await.unwrap();
        store.insert(record("a", "u1", vec![1.0, 0.0])).await.unwrap();

        let records = store.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "content a (retried)");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_store_error() {
        let store = InMemoryVectorStore::new();
        store.insert(record("a", "u1", vec![1.0, 0.0, 0.0])).await.unwrap();

        let err = store
            .query(&VectorQuery {
                user_id: "u1".to_string(),
                vector: vec![1.0, 0.0],
                top_k: 5,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "store_unavailable");
    }
}
