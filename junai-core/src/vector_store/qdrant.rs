use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        condition::ConditionOneOf, r#match::MatchValue, value::Kind, vectors_config::Config,
        Condition, CreateCollection, Distance, FieldCondition, Filter, Match, PointStruct,
        ScoredPoint, SearchPoints, UpsertPoints, Value, VectorParams, VectorsConfig,
    },
    Qdrant,
};
use tokio::sync::OnceCell;
use tracing::{error, info};
use uuid::Uuid;

use super::{VectorMatch, VectorQuery, VectorRecord, VectorStore};
use crate::error::{NavigationError, Result};

/// Qdrant-backed vector store. One collection holds every user's records;
/// queries are scoped with a `user_id` keyword filter.
#[derive(Clone)]
pub struct QdrantVectorStore {
    client: Arc<Qdrant>,
    collection: String,
    embedding_dim: usize,
    collection_ready: Arc<OnceCell<()>>,
}

impl std::fmt::Debug for QdrantVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantVectorStore")
            .field("collection", &self.collection)
            .field("embedding_dim", &self.embedding_dim)
            .finish()
    }
}

fn string_value(s: impl Into<String>) -> Value {
    Value {
        kind: Some(Kind::StringValue(s.into())),
    }
}

fn extract_string(value: &Value) -> String {
    match value.kind.as_ref() {
        Some(Kind::StringValue(s)) => s.clone(),
        Some(Kind::IntegerValue(i)) => i.to_string(),
        Some(Kind::DoubleValue(d)) => d.to_string(),
        Some(Kind::BoolValue(b)) => b.to_string(),
        _ => String::new(),
    }
}

impl QdrantVectorStore {
    pub fn connect(
        url: &str,
        api_key: Option<String>,
        collection: impl Into<String>,
        embedding_dim: usize,
    ) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .build()
            .map_err(|e| NavigationError::store("connect", e.to_string()))?;

        let collection = collection.into();
        info!(
            qdrant_url = %url,
            collection = %collection,
            embedding_dim = embedding_dim,
            "Qdrant vector store configured"
        );

        Ok(Self {
            client: Arc::new(client),
            collection,
            embedding_dim,
            collection_ready: Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_collection(&self) -> Result<()> {
        self.collection_ready
            .get_or_try_init(|| async {
                let collections = self.client.list_collections().await.map_err(|e| {
                    error!(error = %e, collection = %self.collection, "Failed to list collections");
                    NavigationError::store("list_collections", e.to_string())
                })?;

                let exists = collections
                    .collections
                    .iter()
                    .any(|c| c.name == self.collection);

                if !exists {
                    info!(
                        collection = %self.collection,
                        embedding_dim = self.embedding_dim,
                        "Creating Qdrant collection"
                    );
                    let create_collection = CreateCollection {
                        collection_name: self.collection.clone(),
                        vectors_config: Some(VectorsConfig {
                            config: Some(Config::Params(VectorParams {
                                size: self.embedding_dim as u64,
                                distance: Distance::Cosine as i32,
                                ..Default::default()
                            })),
                        }),
                        ..Default::default()
                    };
                    self.client
                        .create_collection(create_collection)
                        .await
                        .map_err(|e| {
                            error!(error = %e, collection = %self.collection, "Failed to create collection");
                            NavigationError::store("create_collection", e.to_string())
                        })?;
                }
                Ok::<(), NavigationError>(())
            })
            .await
            .map(|_| ())
    }

    fn user_filter(user_id: &str) -> Filter {
        Filter {
            must: vec![Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: "user_id".to_string(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(user_id.to_string())),
                    }),
                    ..Default::default()
                })),
            }],
            ..Default::default()
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn query(&self, query: &VectorQuery) -> Result<Vec<VectorMatch>> {
        self.ensure_collection().await?;

        let search_points = SearchPoints {
            collection_name: self.collection.clone(),
            vector: query.vector.clone(),
            filter: Some(Self::user_filter(&query.user_id)),
            limit: query.top_k as u64,
            with_payload: Some(true.into()),
            ..Default::default()
        };

        let response = self.client.search_points(search_points).await.map_err(|e| {
            error!(error = %e, user_id = %query.user_id, "Failed to search points in Qdrant");
            NavigationError::store("query", e.to_string())
        })?;

        let matches: Vec<VectorMatch> = response
            .result
            .into_iter()
            .map(|point: ScoredPoint| VectorMatch {
                content: point
                    .payload
                    .get("content")
                    .map(extract_string)
                    .unwrap_or_default(),
                score: point.score,
            })
            .collect();

        tracing::debug!(
            user_id = %query.user_id,
            result_count = matches.len(),
            "Qdrant query completed"
        );
        Ok(matches)
    }

    async fn insert(&self, record: VectorRecord) -> Result<()> {
        self.ensure_collection().await?;

        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert("record_id".to_string(), string_value(record.id.clone()));
        payload.insert("user_id".to_string(), string_value(record.user_id.clone()));
        payload.insert("content".to_string(), string_value(record.content));
        payload.insert("data".to_string(), string_value(record.data.to_string()));

        // Point ids must be UUIDs or integers; the record id lives in the payload.
        // Reusing the record key makes a repeated upsert overwrite the same point.
        let point = PointStruct::new(record.key.to_string(), record.vector, payload);
        let upsert = UpsertPoints {
            collection_name: self.collection.clone(),
            points: vec![point],
            ..Default::default()
        };

        self.client.upsert_points(upsert).await.map_err(|e| {
            error!(error = %e, record_id = %record.id, "Failed to upsert point to Qdrant");
            NavigationError::store("insert", e.to_string())
        })?;

        info!(record_id = %record.id, user_id = %record.user_id, "Execution record stored in Qdrant");
        Ok(())
    }
}
