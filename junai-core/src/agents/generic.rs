use async_trait::async_trait;

use super::{Agent, AgentInput};
use crate::error::Result;
use crate::types::ExecutionResult;

/// Fallback for any skill without a dedicated agent. Performs no I/O.
#[derive(Debug, Clone)]
pub struct GenericAgent {
    skill_type: String,
}

impl GenericAgent {
    pub fn new(skill_type: impl Into<String>) -> Self {
        Self {
            skill_type: skill_type.into(),
        }
    }
}

#[async_trait]
impl Agent for GenericAgent {
    async fn execute(&self, input: AgentInput) -> Result<ExecutionResult> {
        tracing::debug!(
            skill_type = %self.skill_type,
            prompt_length = input.prompt.len(),
            "Generic agent executing"
        );
        Ok(ExecutionResult::new(format!("Executed {}", self.skill_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generic_agent_reports_skill() {
        let agent = GenericAgent::new("summarize");
        let result = agent.execute(AgentInput::new("anything")).await.unwrap();
        assert_eq!(result, ExecutionResult::new("Executed summarize"));
    }
}
