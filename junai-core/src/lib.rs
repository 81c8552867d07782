//! junai-core
//!
//! Plan-execute-store orchestration: a [`NavigationAgent`] retrieves a user's
//! context from [`Memory`], asks a [`PlanGenerator`] for a step plan, runs each
//! step through the agent the [`SkillRegistry`] resolves for it, and records
//! every execution back into memory.

pub mod agents;
pub mod config;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod navigation;
pub mod planner;
pub mod retry;
pub mod types;
pub mod vector_store;

pub use agents::{Agent, AgentInput, SkillRegistry};
pub use config::CoreConfig;
pub use error::{NavigationError, Result};
pub use memory::Memory;
pub use navigation::NavigationAgent;
pub use planner::{FinalizeStrategy, Plan, PlanGenerator, PlanParser, PlanStep, StepInput};
pub use retry::{NavigationPolicies, RetryPolicy};
pub use types::{Context, ExecutionResult, Task};
