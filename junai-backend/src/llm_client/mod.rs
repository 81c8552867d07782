use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use junai_core::planner::{ExternalLlm, LlmCallInput, LlmCallOutput};

// --- Concrete Client Implementation (HTTP Endpoint) ---
/// Posts [`LlmCallInput`] as JSON to a planning endpoint and extracts the JSON
/// body from the reply.
pub struct HttpLlmClient {
    http_client: Client,
    endpoint_url: String,
}

impl HttpLlmClient {
    pub fn new(endpoint_url: String, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for LLM")?;

        Ok(Self {
            http_client,
            endpoint_url,
        })
    }
}

#[async_trait]
impl ExternalLlm for HttpLlmClient {
    async fn call(&self, input: LlmCallInput) -> Result<LlmCallOutput> {
        tracing::debug!(
            endpoint = %self.endpoint_url,
            schema = %input.schema_name,
            "Sending LLM call"
        );

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .json(&input)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            bail!("LLM API call failed with status: {}. Body: {}", status, text);
        }

        let raw_response = response.text().await?;

        // An unreadable reply is a planning problem, not a transport failure:
        // hand back `null` and let the planner reject it.
        let json_body = extract_json(&raw_response).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "LLM reply carried no JSON body");
            serde_json::Value::Null
        });

        Ok(LlmCallOutput {
            raw_response,
            json_body,
        })
    }
}

/// Accepts either a pure JSON reply or the first ```` ```json ```` fenced block.
pub fn extract_json(raw: &str) -> Result<serde_json::Value> {
    if let Ok(v) = serde_json::from_str(raw) {
        return Ok(v);
    }

    let Some(start) = raw.find("```json") else {
        bail!("Response was neither pure JSON nor contained a '```json' block.");
    };
    let body = &raw[start + 7..];
    let Some(end) = body.find("```") else {
        bail!("Unterminated '```json' block in LLM response.");
    };
    serde_json::from_str(body[..end].trim()).context("Invalid JSON inside '```json' block")
}
