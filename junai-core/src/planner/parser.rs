use serde_json::{Map, Value};

use super::{FinalizeStrategy, Plan, PlanStep, RawPlan, StepInput};
use crate::error::{NavigationError, Result};

/// Converts a generator's raw step list into a [`Plan`].
pub struct PlanParser;

impl PlanParser {
    /// Copies the steps in order and derives each step's [`StepInput`].
    /// A step without a skill type is a `ValidationError`.
    pub fn parse(raw: RawPlan, finalizer: FinalizeStrategy) -> Result<Plan> {
        let steps = raw
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| {
                if step.skill_type.trim().is_empty() {
                    return Err(NavigationError::validation(format!(
                        "plan step {} has no skill type",
                        index
                    )));
                }
                let input = Self::step_input(&step.parameters);
                Ok(PlanStep {
                    skill_type: step.skill_type,
                    parameters: step.parameters,
                    input,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Plan { steps, finalizer })
    }

    /// `prompt` wins when it is a string (even an empty one); otherwise a truthy
    /// `query` is used, coerced with `to_text`; otherwise the task description.
    pub fn step_input(parameters: &Map<String, Value>) -> StepInput {
        if let Some(Value::String(prompt)) = parameters.get("prompt") {
            return StepInput::Prompt(prompt.clone());
        }
        match parameters.get("query") {
            Some(query) if is_truthy(query) => StepInput::Query(to_text(query)),
            _ => StepInput::TaskDescription,
        }
    }
}

/// Script-style string coercion: arrays join their items with `,` (null items
/// become empty), objects render as `[object Object]`, and integral numbers
/// drop the fractional part.
fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
