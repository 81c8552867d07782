//! Environment-driven configuration.
//!
//! The host loads `.env` (via `dotenvy`) before calling [`CoreConfig::from_env`].
//! Every variable has a default; malformed values are reported as
//! `ValidationError` instead of being silently replaced.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::agents::{BindAiConfig, Locale};
use crate::embedding::DEFAULT_EMBEDDING_DIM;
use crate::error::{NavigationError, Result};
use crate::memory::DEFAULT_TOP_K;
use crate::planner::FinalizeStrategy;
use crate::retry::{NavigationPolicies, RetryPolicy};

pub const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6334";
pub const DEFAULT_QDRANT_COLLECTION: &str = "junai_memory";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryBackend {
    InMemory,
    Qdrant {
        url: String,
        api_key: Option<String>,
        collection: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerBackend {
    /// Fixed search-then-summarize template.
    Template,
    /// Planning through an LLM endpoint.
    Llm { url: String },
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub bindai: BindAiConfig,
    pub embedding_dim: usize,
    pub memory_top_k: usize,
    pub memory_backend: MemoryBackend,
    pub planner_backend: PlannerBackend,
    pub finalize: FinalizeStrategy,
    pub policies: NavigationPolicies,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            bindai: BindAiConfig::default(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            memory_top_k: DEFAULT_TOP_K,
            memory_backend: MemoryBackend::InMemory,
            planner_backend: PlannerBackend::Template,
            finalize: FinalizeStrategy::default(),
            policies: NavigationPolicies::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let bindai = BindAiConfig {
            api_key: var("BINDAI_API_KEY"),
            base_url: var("BINDAI_BASE_URL").unwrap_or(defaults.bindai.base_url),
            locale: var("BINDAI_LOCALE")
                .map(|v| Locale::parse(&v))
                .unwrap_or(defaults.bindai.locale),
            timeout: Duration::from_secs(parse_or(
                &var,
                "BINDAI_TIMEOUT_SECS",
                defaults.bindai.timeout.as_secs(),
            )?),
        };

        let memory_backend = match var("MEMORY_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("memory") | Some("mock") => MemoryBackend::InMemory,
            Some("qdrant") => MemoryBackend::Qdrant {
                url: var("QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
                api_key: var("QDRANT_API_KEY"),
                collection: var("QDRANT_COLLECTION")
                    .unwrap_or_else(|| DEFAULT_QDRANT_COLLECTION.to_string()),
            },
            Some(other) => {
                return Err(NavigationError::validation(format!(
                    "MEMORY_BACKEND must be 'memory' or 'qdrant', got '{}'",
                    other
                )))
            }
        };

        let planner_backend = match var("PLANNER_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("template") => PlannerBackend::Template,
            Some("llm") => PlannerBackend::Llm {
                url: var("PLANNER_LLM_URL").ok_or_else(|| {
                    NavigationError::validation("PLANNER_LLM_URL is required when PLANNER_BACKEND=llm")
                })?,
            },
            Some(other) => {
                return Err(NavigationError::validation(format!(
                    "PLANNER_BACKEND must be 'template' or 'llm', got '{}'",
                    other
                )))
            }
        };

        let finalize = match var("PLAN_FINALIZE") {
            Some(v) => v.parse()?,
            None => defaults.finalize,
        };

        let embedding_dim: usize = parse_or(&var, "EMBEDDING_MODEL_DIM", defaults.embedding_dim)?;
        if embedding_dim == 0 {
            return Err(NavigationError::validation("EMBEDDING_MODEL_DIM must be positive"));
        }

        Ok(Self {
            bindai,
            embedding_dim,
            memory_top_k: parse_or(&var, "MEMORY_TOP_K", defaults.memory_top_k)?.max(1),
            memory_backend,
            planner_backend,
            finalize,
            policies: NavigationPolicies {
                memory: retry_policy(&var, "MEMORY")?,
                planner: retry_policy(&var, "PLANNER")?,
                agent: retry_policy(&var, "AGENT")?,
            },
        })
    }
}

fn parse_or<T, V>(var: &V, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| {
            NavigationError::validation(format!("{} must be a valid number, got '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

/// Reads `<PREFIX>_RETRY_MAX_ATTEMPTS`, `<PREFIX>_RETRY_BASE_DELAY_MS`,
/// `<PREFIX>_RETRY_MAX_DELAY_MS` and `<PREFIX>_TIMEOUT_MS`.
fn retry_policy<V>(var: &V, prefix: &str) -> Result<RetryPolicy>
where
    V: Fn(&str) -> Option<String>,
{
    let defaults = RetryPolicy::default();
    let max_attempts = parse_or(var, &format!("{}_RETRY_MAX_ATTEMPTS", prefix), defaults.max_attempts)?;
    let base_ms = parse_or(
        var,
        &format!("{}_RETRY_BASE_DELAY_MS", prefix),
        defaults.base_delay.as_millis() as u64,
    )?;
    let max_ms = parse_or(
        var,
        &format!("{}_RETRY_MAX_DELAY_MS", prefix),
        defaults.max_delay.as_millis() as u64,
    )?;
    let timeout_ms: Option<u64> = match var(&format!("{}_TIMEOUT_MS", prefix)) {
        Some(_) => Some(parse_or(var, &format!("{}_TIMEOUT_MS", prefix), 0)?),
        None => None,
    };

    Ok(RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_backoff(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
        .with_attempt_timeout(timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)))
}
