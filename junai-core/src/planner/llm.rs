use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{PlanGenerator, PlanRequest, RawPlan};
use crate::error::{NavigationError, Result};

// --- LLM client seam ---
// Defined here so the planner can talk to a model without depending on the
// host's HTTP client implementation.

/// Trait for external LLM services used for planning.
#[async_trait]
pub trait ExternalLlm: Send + Sync {
    /// Calls the external LLM service with the prompt and expected schema.
    async fn call(&self, input: LlmCallInput) -> anyhow::Result<LlmCallOutput>;
}

/// Request sent to the external LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallInput {
    pub prompt: String,
    /// Tells the LLM service which structured JSON output is expected.
    pub schema_name: String,
    pub temperature: f32,
}

/// Structured response received from the external LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmCallOutput {
    pub raw_response: String,
    pub json_body: serde_json::Value,
}

pub const PLAN_SCHEMA: &str = "StepPlan";

/// Plans through a language model, constrained to the registry's skills.
pub struct LlmPlanGenerator {
    llm: Arc<dyn ExternalLlm>,
    temperature: f32,
}

impl std::fmt::Debug for LlmPlanGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmPlanGenerator")
            .field("llm", &"Arc<dyn ExternalLlm>")
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl LlmPlanGenerator {
    pub fn new(llm: Arc<dyn ExternalLlm>) -> Self {
        Self {
            llm,
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn prompt(request: &PlanRequest) -> String {
        let context = if request.context.is_empty() {
            "(none)".to_string()
        } else {
            request
                .context
                .iter()
                .map(|s| format!("- {}", s))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "Task: {}\n\nContext from Memory:\n{}\n\nAvailable skills: {}\n\n\
             Produce a {} as JSON: {{\"steps\": [{{\"skillType\": \"<skill>\", \"parameters\": {{...}}}}]}}. \
             Use only the available skills. Put the text for a skill in \"prompt\" or \"query\".",
            request.task,
            context,
            request.available_skills.join(", "),
            PLAN_SCHEMA
        )
    }
}

#[async_trait]
impl PlanGenerator for LlmPlanGenerator {
    async fn generate(&self, request: &PlanRequest) -> Result<RawPlan> {
        let output = self
            .llm
            .call(LlmCallInput {
                prompt: Self::prompt(request),
                schema_name: PLAN_SCHEMA.to_string(),
                temperature: self.temperature,
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Planning LLM call failed");
                NavigationError::remote("planner", e.to_string())
            })?;

        if output.json_body.is_null() {
            return Err(NavigationError::validation(
                "planner reply contained no JSON plan",
            ));
        }

        let plan: RawPlan = serde_json::from_value(output.json_body).map_err(|e| {
            NavigationError::validation(format!("planner returned an invalid plan: {}", e))
        })?;

        if let Some(step) = plan
            .steps
            .iter()
            .find(|s| !request.available_skills.iter().any(|a| a == &s.skill_type))
        {
            return Err(NavigationError::validation(format!(
                "planner chose unavailable skill '{}'",
                step.skill_type
            )));
        }

        tracing::debug!(step_count = plan.steps.len(), "LLM plan generated");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedLlm {
        body: serde_json::Value,
        prompts: Mutex<Vec<LlmCallInput>>,
    }

    #[async_trait]
    impl ExternalLlm for ScriptedLlm {
        async fn call(&self, input: LlmCallInput) -> anyhow::Result<LlmCallOutput> {
            self.prompts.lock().unwrap().push(input);
            Ok(LlmCallOutput {
                raw_response: self.body.to_string(),
                json_body: self.body.clone(),
            })
        }
    }

    struct DownLlm;

    #[async_trait]
    impl ExternalLlm for DownLlm {
        async fn call(&self, _input: LlmCallInput) -> anyhow::Result<LlmCallOutput> {
            anyhow::bail!("LLM API call failed with status: 503")
        }
    }

    fn request() -> PlanRequest {
        PlanRequest {
            task: "deploy app".to_string(),
            context: vec!["note A".to_string()],
            available_skills: vec!["search".to_string(), "bindai".to_string()],
        }
    }

    #[tokio::test]
    async fn test_plan_is_decoded_and_prompt_lists_skills() {
        let llm = Arc::new(ScriptedLlm {
            body: json!({"steps": [
                {"skillType": "search", "parameters": {"query": "deploy app"}},
                {"skillType": "bindai", "parameters": {"prompt": "write release notes"}}
            ]}),
            prompts: Mutex::new(Vec::new()),
        });
        let generator = LlmPlanGenerator::new(llm.clone());

        let plan = generator.generate(&request()).await.unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[1].skill_type, "bindai");

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts[0].schema_name, PLAN_SCHEMA);
        assert!(prompts[0].prompt.contains("Available skills: search, bindai"));
        assert!(prompts[0].prompt.contains("- note A"));
    }

    #[tokio::test]
    async fn test_unavailable_skill_is_rejected() {
        let llm = Arc::new(ScriptedLlm {
            body: json!({"steps": [{"skillType": "rm_rf", "parameters": {}}]}),
            prompts: Mutex::new(Vec::new()),
        });
        let err = LlmPlanGenerator::new(llm).generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert!(err.to_string().contains("rm_rf"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let llm = Arc::new(ScriptedLlm {
            body: json!({"steps": "not a list"}),
            prompts: Mutex::new(Vec::new()),
        });
        let err = LlmPlanGenerator::new(llm).generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_missing_json_body_is_validation_error() {
        let llm = Arc::new(ScriptedLlm {
            body: serde_json::Value::Null,
            prompts: Mutex::new(Vec::new()),
        });
        let err = LlmPlanGenerator::new(llm).generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert!(err.to_string().contains("no JSON plan"));
    }

    #[tokio::test]
    async fn test_llm_failure_is_remote_call_failed() {
        let err = LlmPlanGenerator::new(Arc::new(DownLlm))
            .generate(&request())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "remote_call_failed");
    }
}
