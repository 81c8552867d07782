//! The plan-execute-store control loop.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::agents::{AgentInput, SkillRegistry};
use crate::config::{CoreConfig, MemoryBackend, PlannerBackend};
use crate::embedding::{EmbeddingService, HashingEmbedding};
use crate::error::{NavigationError, Result};
use crate::memory::Memory;
use crate::planner::{
    ExternalLlm, FinalizeStrategy, LlmPlanGenerator, PlanGenerator, PlanParser, PlanRequest,
    TemplatePlanGenerator,
};
use crate::retry::{with_retry, NavigationPolicies};
use crate::types::{ExecutionResult, Task};
use crate::vector_store::{InMemoryVectorStore, QdrantVectorStore, VectorStore};

/// Plans a task from the user's memory and executes it step by step:
/// 1. Context retrieval (Memory)
/// 2. Plan generation and parsing (PlanGenerator, PlanParser)
/// 3. For each step: agent resolution, execution, execution record storage
/// 4. Final result compilation (Plan finalizer)
///
/// Steps run strictly in order and a step's record is stored before the next
/// step starts. Any error aborts the task; already stored records stay.
pub struct NavigationAgent {
    memory: Memory,
    planner: Arc<dyn PlanGenerator>,
    registry: Arc<SkillRegistry>,
    finalizer: FinalizeStrategy,
    policies: NavigationPolicies,
}

// Manual Debug implementation since trait objects can't derive Debug
impl std::fmt::Debug for NavigationAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationAgent")
            .field("memory", &self.memory)
            .field("planner", &"Arc<dyn PlanGenerator>")
            .field("registry", &self.registry)
            .field("finalizer", &self.finalizer)
            .field("policies", &self.policies)
            .finish()
    }
}

impl NavigationAgent {
    pub fn new(
        memory: Memory,
        planner: Arc<dyn PlanGenerator>,
        registry: Arc<SkillRegistry>,
    ) -> Self {
        Self {
            memory,
            planner,
            registry,
            finalizer: FinalizeStrategy::default(),
            policies: NavigationPolicies::default(),
        }
    }

    pub fn with_finalizer(mut self, finalizer: FinalizeStrategy) -> Self {
        self.finalizer = finalizer;
        self
    }

    pub fn with_policies(mut self, policies: NavigationPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// Wires every component from config. `llm` is required when the planner
    /// backend is [`PlannerBackend::Llm`].
    pub fn from_config(config: &CoreConfig, llm: Option<Arc<dyn ExternalLlm>>) -> Result<Self> {
        let embedding: Arc<dyn EmbeddingService> =
            Arc::new(HashingEmbedding::new(config.embedding_dim));

        let store: Arc<dyn VectorStore> = match &config.memory_backend {
            MemoryBackend::InMemory => Arc::new(InMemoryVectorStore::new()),
            MemoryBackend::Qdrant {
                url,
                api_key,
                collection,
            } => Arc::new(QdrantVectorStore::connect(
                url,
                api_key.clone(),
                collection.clone(),
                config.embedding_dim,
            )?),
        };

        let planner: Arc<dyn PlanGenerator> = match (&config.planner_backend, llm) {
            (PlannerBackend::Template, _) => Arc::new(TemplatePlanGenerator),
            (PlannerBackend::Llm { .. }, Some(llm)) => Arc::new(LlmPlanGenerator::new(llm)),
            (PlannerBackend::Llm { .. }, None) => {
                return Err(NavigationError::validation(
                    "LLM planner selected but no LLM client was provided",
                ))
            }
        };

        let registry = Arc::new(SkillRegistry::with_defaults(config.bindai.clone())?);
        let memory = Memory::new(store, embedding).with_top_k(config.memory_top_k);

        info!(
            memory_backend = ?config.memory_backend,
            planner_backend = ?config.planner_backend,
            finalize = ?config.finalize,
            skills = ?registry.available_skills(),
            "NavigationAgent assembled from config"
        );

        Ok(Self::new(memory, planner, registry)
            .with_finalizer(config.finalize)
            .with_policies(config.policies))
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    /// Runs one task to completion.
    pub async fn execute_task(&self, task: &Task) -> Result<ExecutionResult> {
        let started = Instant::now();
        task.validate()?;

        info!(
            user_id = %task.user_id,
            description = %task.description,
            "Executing task"
        );

        let result = self.run(task).await;
        match &result {
            Ok(_) => info!(
                user_id = %task.user_id,
                latency_ms = started.elapsed().as_millis() as u64,
                "Task completed"
            ),
            Err(e) => error!(
                user_id = %task.user_id,
                error_kind = e.kind(),
                error = %e,
                "Task aborted"
            ),
        }
        result
    }

    async fn run(&self, task: &Task) -> Result<ExecutionResult> {
        // --- Step 1: Context retrieval ---
        let context = with_retry(
            &self.policies.memory,
            "memory.retrieve_context",
            || NavigationError::store("query", "context retrieval timed out"),
            || self.memory.retrieve_context(&task.user_id),
        )
        .await?;

        // --- Step 2: Planning ---
        let request = PlanRequest {
            task: task.description.clone(),
            context: context.snippets,
            available_skills: self.registry.available_skills(),
        };
        let raw = with_retry(
            &self.policies.planner,
            "planner.generate",
            || NavigationError::remote("planner", "plan generation timed out"),
            || self.planner.generate(&request),
        )
        .await?;
        let plan = PlanParser::parse(raw, self.finalizer)?;

        tracing::debug!(
            user_id = %task.user_id,
            step_count = plan.steps.len(),
            skills = ?plan.steps.iter().map(|s| s.skill_type.as_str()).collect::<Vec<_>>(),
            "Plan ready"
        );

        // --- Step 3: Sequential execution ---
        let mut step_results = Vec::with_capacity(plan.steps.len());
        for (index, step) in plan.steps.iter().enumerate() {
            let agent = self.registry.resolve(&step.skill_type);
            let prompt = step.input.prompt(&task.description).to_string();

            info!(
                user_id = %task.user_id,
                step = index,
                skill_type = %step.skill_type,
                "Executing plan step"
            );

            let result = with_retry(
                &self.policies.agent,
                "agent.execute",
                || NavigationError::remote(step.skill_type.clone(), "agent call timed out"),
                || agent.execute(AgentInput::new(prompt.clone())),
            )
            .await?;

            // Built once: every retry writes the same record key.
            let record = self
                .memory
                .prepare_execution(&task.user_id, step, &result)
                .await?;
            with_retry(
                &self.policies.memory,
                "memory.store_execution",
                || NavigationError::store("insert", "execution storage timed out"),
                || self.memory.insert_record(record.clone()),
            )
            .await?;

            step_results.push(result);
        }

        // --- Step 4: Final result ---
        Ok(plan.compile_final_result(&step_results))
    }
}
