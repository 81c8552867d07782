use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT_LANGUAGE, Client};
use serde_json::{json, Value};
use tracing::{error, info};

use super::{Agent, AgentInput};
use crate::error::{NavigationError, Result};
use crate::types::ExecutionResult;

pub const BINDAI_SKILL: &str = "bindai";
pub const DEFAULT_BINDAI_BASE_URL: &str = "https://api.bindai.com/v1";
pub const DEFAULT_BINDAI_TIMEOUT: Duration = Duration::from_secs(60);

/// Locale used for the `Accept-Language` header and for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    ZhTw,
    En,
}

impl Locale {
    /// `zh-tw` (any case, `_` or `-`) selects Traditional Chinese; anything else English.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "zh-tw" => Self::ZhTw,
            _ => Self::En,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZhTw => "zh-tw",
            Self::En => "en",
        }
    }

    fn failure_message(&self, detail: &str) -> String {
        match self {
            Self::ZhTw => format!("BindAi 請求失敗: {}", detail),
            Self::En => format!("BindAi request failed: {}", detail),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub locale: Locale,
    pub timeout: Duration,
}

impl Default for BindAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BINDAI_BASE_URL.to_string(),
            locale: Locale::default(),
            timeout: DEFAULT_BINDAI_TIMEOUT,
        }
    }
}

/// Remote text-completion agent for the `bindai` skill.
#[derive(Debug, Clone)]
pub struct BindAiAgent {
    http_client: Client,
    config: BindAiConfig,
}

impl BindAiAgent {
    pub fn new(config: BindAiConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NavigationError::remote(BINDAI_SKILL, e.to_string()))?;

        if config.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            tracing::warn!("BindAi agent configured without an API key; calls will be rejected");
        }

        Ok(Self {
            http_client,
            config,
        })
    }

    fn failure(&self, detail: impl AsRef<str>) -> NavigationError {
        NavigationError::remote(BINDAI_SKILL, self.config.locale.failure_message(detail.as_ref()))
    }

    /// Calls `POST <base_url>/complete` and returns the `result` field.
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<Value> {
        let url = format!("{}/complete", self.config.base_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .header(ACCEPT_LANGUAGE, self.config.locale.as_str())
            .json(&json!({ "prompt": prompt }))
            .send()
            .await
            .map_err(|e| self.failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| format!("request failed with status code {}", status.as_u16()));
            return Err(self.failure(detail));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.failure(e.to_string()))?;

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Agent for BindAiAgent {
    async fn execute(&self, input: AgentInput) -> Result<ExecutionResult> {
        let api_key = match self.config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(NavigationError::AuthenticationMissing {
                    agent: BINDAI_SKILL.to_string(),
                })
            }
        };

        info!(
            base_url = %self.config.base_url,
            locale = self.config.locale.as_str(),
            prompt_length = input.prompt.len(),
            "Calling BindAi completion"
        );

        let output = self.complete(api_key, &input.prompt).await.map_err(|e| {
            error!(error = %e, "BindAi completion failed");
            e
        })?;

        Ok(ExecutionResult { output })
    }
}
