//! Skill agents and the registry that resolves them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ExecutionResult;

mod bindai;
mod generic;
mod registry;

pub use bindai::{BindAiAgent, BindAiConfig, Locale, BINDAI_SKILL};
pub use generic::GenericAgent;
pub use registry::{AgentConstructor, SkillRegistry};

/// Input handed to an agent for one plan step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInput {
    pub prompt: String,
}

impl AgentInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// A polymorphic executor turning a prompt into a result for one skill type.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn execute(&self, input: AgentInput) -> Result<ExecutionResult>;
}
