use std::collections::HashMap;
use std::sync::Arc;

use super::{Agent, BindAiAgent, BindAiConfig, GenericAgent, BINDAI_SKILL};
use crate::error::Result;

/// Builds the agent for a skill type. Receives the requested skill type.
pub type AgentConstructor = Arc<dyn Fn(&str) -> Arc<dyn Agent> + Send + Sync>;

/// Skills served by [`GenericAgent`] that are advertised to the planner by default.
pub const DEFAULT_GENERIC_SKILLS: &[&str] = &["search", "summarize", "executeScript"];

/// Maps skill types to agent constructors.
///
/// Resolution never fails: skill types without a registered constructor get a
/// [`GenericAgent`], so an unknown skill never blocks a plan.
#[derive(Default, Clone)]
pub struct SkillRegistry {
    constructors: HashMap<String, AgentConstructor>,
    /// Skills offered to the planner, in declaration order.
    skills: Vec<String>,
}

impl std::fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<_> = self.constructors.keys().collect();
        registered.sort();
        f.debug_struct("SkillRegistry")
            .field("registered", &registered)
            .field("skills", &self.skills)
            .finish()
    }
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default registry: generic `search`, `summarize`, `executeScript` plus the
    /// `bindai` remote agent.
    pub fn with_defaults(bindai: BindAiConfig) -> Result<Self> {
        let bindai_agent: Arc<dyn Agent> = Arc::new(BindAiAgent::new(bindai)?);
        let registry = DEFAULT_GENERIC_SKILLS
            .iter()
            .fold(Self::new(), |registry, skill| registry.advertise(*skill))
            .register_agent(BINDAI_SKILL, bindai_agent);
        Ok(registry)
    }

    /// Registers a constructor for `skill_type`, replacing any previous one.
    pub fn register<F>(mut self, skill_type: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&str) -> Arc<dyn Agent> + Send + Sync + 'static,
    {
        let skill_type = skill_type.into();
        if self.constructors.contains_key(&skill_type) {
            tracing::warn!(skill_type = %skill_type, "Agent already registered; overwriting");
        }
        self.remember(&skill_type);
        self.constructors.insert(skill_type, Arc::new(constructor));
        self
    }

    /// Registers a shared agent instance for `skill_type`.
    pub fn register_agent(self, skill_type: impl Into<String>, agent: Arc<dyn Agent>) -> Self {
        self.register(skill_type, move |_| Arc::clone(&agent))
    }

    /// Advertises a skill served by the generic fallback.
    pub fn advertise(mut self, skill_type: impl Into<String>) -> Self {
        self.remember(&skill_type.into());
        self
    }

    fn remember(&mut self, skill_type: &str) {
        if !self.skills.iter().any(|s| s == skill_type) {
            self.skills.push(skill_type.to_string());
        }
    }

    pub fn resolve(&self, skill_type: &str) -> Arc<dyn Agent> {
        match self.constructors.get(skill_type) {
            Some(constructor) => constructor(skill_type),
            None => {
                tracing::debug!(skill_type = %skill_type, "No dedicated agent; using generic fallback");
                Arc::new(GenericAgent::new(skill_type))
            }
        }
    }

    pub fn is_registered(&self, skill_type: &str) -> bool {
        self.constructors.contains_key(skill_type)
    }

    /// Skill identifiers the planner may use.
    pub fn available_skills(&self) -> Vec<String> {
        self.skills.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentInput;
    use crate::types::ExecutionResult;
    use async_trait::async_trait;

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        async fn execute(&self, input: AgentInput) -> Result<ExecutionResult> {
            Ok(ExecutionResult::new(input.prompt))
        }
    }

    #[tokio::test]
    async fn test_unknown_skills_resolve_to_generic_agent() {
        let registry = SkillRegistry::new();
        for skill in ["search", "summarize", "", "definitely-not-a-skill"] {
            let agent = registry.resolve(skill);
            let result = agent.execute(AgentInput::new("p")).await.unwrap();
            assert_eq!(result.output_text(), format!("Executed {}", skill));
        }
    }

    #[tokio::test]
    async fn test_registered_constructor_wins() {
        let registry = SkillRegistry::new().register("echo", |_| Arc::new(EchoAgent) as Arc<dyn Agent>);
        assert!(registry.is_registered("echo"));

        let result = registry
            .resolve("echo")
            .execute(AgentInput::new("hello"))
            .await
            .unwrap();
        assert_eq!(result.output_text(), "hello");
    }

    #[test]
    fn test_default_skills_in_declaration_order() {
        let registry = SkillRegistry::with_defaults(BindAiConfig::default()).unwrap();
        assert_eq!(
            registry.available_skills(),
            vec!["search", "summarize", "executeScript", "bindai"]
        );
        assert!(registry.is_registered("bindai"));
        assert!(!registry.is_registered("search"));
    }

    #[tokio::test]
    async fn test_default_bindai_without_key_is_authentication_missing() {
        let registry = SkillRegistry::with_defaults(BindAiConfig::default()).unwrap();
        let err = registry
            .resolve("bindai")
            .execute(AgentInput::new("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "authentication_missing");
    }
}
