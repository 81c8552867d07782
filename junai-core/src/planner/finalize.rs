use std::str::FromStr;

use serde_json::Value;

use crate::error::NavigationError;
use crate::types::ExecutionResult;

pub const PLACEHOLDER_OUTPUT: &str = "Final result";

/// How a plan turns its step results into the task's final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalizeStrategy {
    /// Fixed `{ output: "Final result" }`, ignoring step results.
    Placeholder,
    /// Output of the last executed step; `null` for an empty plan.
    #[default]
    LastResult,
    /// Every step output as text, joined with newlines.
    Concatenate,
}

impl FinalizeStrategy {
    pub fn finalize(&self, step_results: &[ExecutionResult]) -> ExecutionResult {
        match self {
            Self::Placeholder => ExecutionResult::new(PLACEHOLDER_OUTPUT),
            Self::LastResult => step_results
                .last()
                .cloned()
                .unwrap_or_else(|| ExecutionResult::new(Value::Null)),
            Self::Concatenate => ExecutionResult::new(
                step_results
                    .iter()
                    .map(ExecutionResult::output_text)
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }
}

impl FromStr for FinalizeStrategy {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "last" | "last_result" => Ok(Self::LastResult),
            "concat" | "concatenate" => Ok(Self::Concatenate),
            other => Err(NavigationError::validation(format!(
                "unknown finalize strategy '{}' (expected placeholder, last or concat)",
                other
            ))),
        }
    }
}
