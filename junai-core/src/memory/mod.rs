use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::embedding::EmbeddingService;
use crate::error::Result;
use crate::planner::PlanStep;
use crate::types::{Context, ExecutionResult};
use crate::vector_store::{VectorQuery, VectorRecord, VectorStore};

pub const DEFAULT_TOP_K: usize = 5;

/// Keywords used when the caller has nothing more specific to search for.
pub const DEFAULT_KEYWORDS: &[&str] = &["default"];

// --- 1. Memory Record Structures ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Execution,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MemoryPayload {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// Human-readable summary, also the text the record is embedded from.
    pub content: String,
    pub result: Value,
    /// RFC 3339, millisecond precision.
    pub timestamp: String,
}

/// Durable record of one executed step. Never mutated after creation.
///
/// `id` is `<skill_type>-<unix millis>` and is not unique under concurrent
/// writes within the same millisecond.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MemoryRecord {
    pub id: String,
    pub user_id: String,
    pub payload: MemoryPayload,
}

impl MemoryRecord {
    pub fn execution(
        user_id: &str,
        step: &PlanStep,
        result: &ExecutionResult,
        at: DateTime<Utc>,
    ) -> Self {
        let params = Value::Object(step.parameters.clone());
        Self {
            id: format!("{}-{}", step.skill_type, at.timestamp_millis()),
            user_id: user_id.to_string(),
            payload: MemoryPayload {
                kind: RecordKind::Execution,
                content: format!("Executed {} with params: {}", step.skill_type, params),
                result: serde_json::to_value(result).unwrap_or(Value::Null),
                timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        }
    }
}

// --- 2. Memory component ---

/// Bridges the navigation loop to a vector-search-backed store.
#[derive(Clone)]
pub struct Memory {
    store: Arc<dyn VectorStore>,
    embedding: Arc<dyn EmbeddingService>,
    top_k: usize,
}

// Manual Debug implementation since trait objects can't derive Debug
impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("store", &"Arc<dyn VectorStore>")
            .field("embedding_dim", &self.embedding.dimension())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl Memory {
    pub fn new(store: Arc<dyn VectorStore>, embedding: Arc<dyn EmbeddingService>) -> Self {
        Self {
            store,
            embedding,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieves the user's context for the default keyword set.
    ///
    /// Store failures propagate as `StoreUnavailable`; nothing is retried here.
    pub async fn retrieve_context(&self, user_id: &str) -> Result<Context> {
        self.retrieve_context_with_keywords(user_id, &[]).await
    }

    /// Same as [`Memory::retrieve_context`] with caller-chosen keywords.
    /// An empty keyword list falls back to [`DEFAULT_KEYWORDS`].
    pub async fn retrieve_context_with_keywords(
        &self,
        user_id: &str,
        keywords: &[String],
    ) -> Result<Context> {
        let keywords: Vec<String> = if keywords.is_empty() {
            DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
        } else {
            keywords.to_vec()
        };

        let vector = self.embedding.embed(&keywords).await?;
        let matches = self
            .store
            .query(&VectorQuery {
                user_id: user_id.to_string(),
                vector,
                top_k: self.top_k,
            })
            .await?;

        tracing::debug!(
            user_id = %user_id,
            keywords = ?keywords,
            snippet_count = matches.len(),
            "Retrieved context from memory"
        );

        Ok(Context {
            user_id: user_id.to_string(),
            snippets: matches.into_iter().map(|m| m.content).collect(),
        })
    }

    /// Persists one execution record. Exactly one store write per call.
    pub async fn store_execution(
        &self,
        user_id: &str,
        step: &PlanStep,
        result: &ExecutionResult,
    ) -> Result<()> {
        let record = self.prepare_execution(user_id, step, result).await?;
        self.insert_record(record).await
    }

    /// Builds and embeds the execution record without writing it.
    ///
    /// The record's id, timestamp and storage key are fixed here, so callers
    /// that retry [`Memory::insert_record`] keep writing the same record.
    pub async fn prepare_execution(
        &self,
        user_id: &str,
        step: &PlanStep,
        result: &ExecutionResult,
    ) -> Result<VectorRecord> {
        let record = MemoryRecord::execution(user_id, step, result, Utc::now());
        let vector = self
            .embedding
            .embed(std::slice::from_ref(&record.payload.content))
            .await?;
        let data = serde_json::to_value(&record.payload).unwrap_or(Value::Null);

        Ok(VectorRecord {
            key: Uuid::new_v4(),
            id: record.id,
            user_id: record.user_id,
            vector,
            content: record.payload.content,
            data,
        })
    }

    /// Writes a prepared record. Repeating the call with the same record
    /// overwrites rather than duplicates.
    pub async fn insert_record(&self, record: VectorRecord) -> Result<()> {
        tracing::info!(
            record_id = %record.id,
            record_key = %record.key,
            user_id = %record.user_id,
            "Storing execution record"
        );
        self.store.insert(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedding;
    use crate::planner::StepInput;
    use crate::vector_store::InMemoryVectorStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn search_step() -> PlanStep {
        let mut parameters = serde_json::Map::new();
        parameters.insert("query".to_string(), json!("deploy app"));
        PlanStep {
            skill_type: "search".to_string(),
            parameters,
            input: StepInput::Query("deploy app".to_string()),
        }
    }

    #[test]
    fn test_execution_record_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let record = MemoryRecord::execution(
            "u1",
            &search_step(),
            &ExecutionResult::new("Executed search"),
            at,
        );

        assert_eq!(record.id, format!("search-{}", at.timestamp_millis()));
        assert_eq!(
            record.payload.content,
            "Executed search with params: {\"query\":\"deploy app\"}"
        );
        assert_eq!(record.payload.timestamp, "2024-01-15T10:30:00.000Z");

        let payload = serde_json::to_value(&record.payload).unwrap();
        assert_eq!(payload["type"], "execution");
        assert_eq!(payload["result"], json!({"output": "Executed search"}));
    }

    #[tokio::test]
    async fn test_stored_executions_become_context() {
        let store = Arc::new(InMemoryVectorStore::new());
        let memory = Memory::new(store.clone(), Arc::new(HashingEmbedding::new(32)));

        memory
            .store_execution("u1", &search_step(), &ExecutionResult::new("ok"))
            .await
            .unwrap();
        memory
            .store_execution("u2", &search_step(), &ExecutionResult::new("ok"))
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);

        let context = memory.retrieve_context("u1").await.unwrap();
        assert_eq!(context.user_id, "u1");
        assert_eq!(
            context.snippets,
            vec!["Executed search with params: {\"query\":\"deploy app\"}".to_string()]
        );
    }

    #[tokio::test]
    async fn test_retrieve_context_caps_at_top_k() {
        let store = Arc::new(InMemoryVectorStore::new());
        let memory = Memory::new(store, Arc::new(HashingEmbedding::new(32))).with_top_k(2);

        for _ in 0..4 {
            memory
                .store_execution("u1", &search_step(), &ExecutionResult::new("ok"))
                .await
                .unwrap();
        }

        let context = memory
            .retrieve_context_with_keywords("u1", &["deploy".to_string()])
            .await
            .unwrap();
        assert_eq!(context.snippets.len(), 2);
    }

    #[tokio::test]
    async fn test_reinserting_prepared_record_keeps_one_copy() {
        let store = Arc::new(InMemoryVectorStore::new());
        let memory = Memory::new(store.clone(), Arc::new(HashingEmbedding::new(32)));

        let record = memory
            .prepare_execution("u1", &search_step(), &ExecutionResult::new("ok"))
            .await
            .unwrap();
        memory.insert_record(record.clone()).await.unwrap();
        memory.insert_record(record.clone()).await.unwrap();

        let stored = store.records().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].key, record.key);
    }
}
