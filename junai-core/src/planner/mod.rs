//! Plan generation and parsing.
//!
//! A [`PlanGenerator`] turns a task and its context into a [`RawPlan`] (the
//! loosely-typed step list a model would emit); [`PlanParser`] validates it and
//! produces a [`Plan`] whose steps carry an explicit [`StepInput`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::ExecutionResult;

mod finalize;
mod llm;
mod parser;

pub use finalize::FinalizeStrategy;
pub use llm::{ExternalLlm, LlmCallInput, LlmCallOutput, LlmPlanGenerator};
pub use parser::PlanParser;

// --- 1. Planner input / raw output ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub task: String,
    pub context: Vec<String>,
    pub available_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    pub skill_type: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawPlan {
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

// --- 2. Parsed plan ---

/// Where a step's agent prompt comes from, decided once at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "text", rename_all = "snake_case")]
pub enum StepInput {
    /// An explicit `prompt` string parameter.
    Prompt(String),
    /// A truthy `query` parameter, coerced to text.
    Query(String),
    /// Neither: the task description is used.
    TaskDescription,
}

impl StepInput {
    pub fn prompt<'a>(&'a self, task_description: &'a str) -> &'a str {
        match self {
            Self::Prompt(text) | Self::Query(text) => text,
            Self::TaskDescription => task_description,
        }
    }
}

/// One unit of planned work. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub skill_type: String,
    /// The named parameters exactly as planned.
    pub parameters: Map<String, Value>,
    pub input: StepInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    pub finalizer: FinalizeStrategy,
}

impl Plan {
    /// Folds the per-step results into the task's final result.
    pub fn compile_final_result(&self, step_results: &[ExecutionResult]) -> ExecutionResult {
        self.finalizer.finalize(step_results)
    }
}

// --- 3. Generators ---

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, request: &PlanRequest) -> Result<RawPlan>;
}

/// Fixed two-step template: `search` the task, then `summarize`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePlanGenerator;

#[async_trait]
impl PlanGenerator for TemplatePlanGenerator {
    async fn generate(&self, request: &PlanRequest) -> Result<RawPlan> {
        let mut search = Map::new();
        search.insert("query".to_string(), Value::String(request.task.clone()));

        Ok(RawPlan {
            steps: vec![
                RawStep {
                    skill_type: "search".to_string(),
                    parameters: search,
                },
                RawStep {
                    skill_type: "summarize".to_string(),
                    parameters: Map::new(),
                },
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_template_plan() {
        let plan = TemplatePlanGenerator
            .generate(&PlanRequest {
                task: "deploy app".to_string(),
                context: vec!["note A".to_string(), "note B".to_string()],
                available_skills: vec!["search".to_string(), "summarize".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            json!({"steps": [
                {"skillType": "search", "parameters": {"query": "deploy app"}},
                {"skillType": "summarize", "parameters": {}}
            ]})
        );
    }

    #[test]
    fn test_raw_plan_accepts_missing_parameters() {
        let plan: RawPlan =
            serde_json::from_value(json!({"steps": [{"skillType": "summarize"}]})).unwrap();
        assert_eq!(plan.steps[0].skill_type, "summarize");
        assert!(plan.steps[0].parameters.is_empty());
    }

    #[test]
    fn test_step_input_prompt_source() {
        assert_eq!(StepInput::Prompt("p".into()).prompt("task"), "p");
        assert_eq!(StepInput::Query("q".into()).prompt("task"), "q");
        assert_eq!(StepInput::TaskDescription.prompt("task"), "task");
    }
}
