use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NavigationError, Result};

// --- 1. Task (caller input) ---

/// A user-scoped unit of work submitted for orchestration.
/// Lives for the duration of one `execute_task` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub user_id: String,
    pub description: String,
}

impl Task {
    pub fn new(user_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            description: description.into(),
        }
    }

    /// Rejects tasks that no collaborator could act on.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(NavigationError::validation("task user_id is required"));
        }
        if self.description.trim().is_empty() {
            return Err(NavigationError::validation("task description is required"));
        }
        Ok(())
    }
}

// --- 2. Context (retrieved memory) ---

/// Background snippets for a user, in the store's relevance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub user_id: String,
    pub snippets: Vec<String>,
}

// --- 3. Execution result ---

/// Output of one agent execution, or of a plan's finalize step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub output: Value,
}

impl ExecutionResult {
    pub fn new(output: impl Into<Value>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// The output as text: strings verbatim, anything else as compact JSON.
    pub fn output_text(&self) -> String {
        match &self.output {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
