use serde::{Deserialize, Serialize};
use serde_json::Value;

use junai_core::{ExecutionResult, NavigationError, Task};

// --- 1. Request from the caller ---
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub user_id: String,
    pub description: String,
}

impl From<TaskRequest> for Task {
    fn from(req: TaskRequest) -> Self {
        Task::new(req.user_id, req.description)
    }
}

// --- 2. Successful response ---
#[derive(Debug, Serialize, Clone)]
pub struct TaskResponse {
    pub output: Value,
}

impl From<ExecutionResult> for TaskResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            output: result.output,
        }
    }
}

// --- 3. Error body ---
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    /// One of the core error kinds, e.g. `store_unavailable`.
    pub error: String,
    pub message: String,
}

impl From<&NavigationError> for ErrorResponse {
    fn from(err: &NavigationError) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
