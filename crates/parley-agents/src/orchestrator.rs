//! Orchestrator Agent
//!
//! Keeps a registry of peer agents and forwards each user message to the
//! peer skill that matches it best. The orchestrator never answers domain
//! questions itself; it only lists its peers when asked.

use async_trait::async_trait;
use parley_a2a::{
    A2aResult, AgentCard, AgentHandler, CapabilityRegistry, InteractionMode, KeywordTable,
    MessageRole, OrchestrationRouter, ParameterSpec, PeerInvoker, Registration, RouteOutcome,
    Skill, TaskMessage,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Agent that routes requests to its peers
#[derive(Debug)]
pub struct OrchestratorAgent {
    router: OrchestrationRouter,
}

impl OrchestratorAgent {
    pub const NAME: &'static str = "OrchestratorAgent";

    /// Create an orchestrator advertising `url` and calling peers through
    /// `invoker`
    pub fn new(url: impl Into<String>, invoker: Arc<dyn PeerInvoker>) -> Self {
        let registry = Arc::new(CapabilityRegistry::new(Self::card(url)));
        Self {
            router: OrchestrationRouter::new(registry, invoker),
        }
    }

    /// Replace the routing vocabulary
    pub fn with_keyword_table(mut self, keywords: KeywordTable) -> Self {
        self.router = self.router.with_keyword_table(keywords);
        self
    }

    /// The card this orchestrator advertises
    pub fn card(url: impl Into<String>) -> AgentCard {
        AgentCard::new(
            Self::NAME,
            "An orchestrator that coordinates tasks across multiple specialized agents",
            url,
        )
        .with_skill(
            Skill::new("orchestrate", "Coordinate tasks across multiple agents")
                .with_parameter("task", ParameterSpec::string("Task to orchestrate")),
        )
        .with_skill(Skill::new("discover_agents", "Discover and list available agents"))
        .with_interaction_modes(vec![InteractionMode::Text])
        .with_metadata("version", json!("1.0.0"))
        .with_metadata("type", json!("orchestrator"))
    }

    /// Registry shared with the dispatcher serving this agent
    pub fn registry(&self) -> Arc<CapabilityRegistry> {
        Arc::clone(self.router.registry())
    }

    pub fn router(&self) -> &OrchestrationRouter {
        &self.router
    }

    pub async fn register_peer(&self, address: &str) -> A2aResult<Registration> {
        self.router.register_peer(address).await
    }

    /// Register every address in order, skipping peers that cannot be
    /// reached. Returns the number registered.
    pub async fn register_peers<I, S>(&self, addresses: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registered = 0;
        for address in addresses {
            let address = address.as_ref();
            match self.register_peer(address).await {
                Ok(_) => registered += 1,
                Err(err) => warn!(address = %address, error = %err, "Skipping peer"),
            }
        }
        info!(registered, "Peer registration finished");
        registered
    }

    /// Route one input and return the full outcome
    pub async fn route(&self, input: &str) -> RouteOutcome {
        self.router.route(input).await
    }
}

#[async_trait]
impl AgentHandler for OrchestratorAgent {
    fn agent_card(&self) -> AgentCard {
        self.router.registry().own_card().as_ref().clone()
    }

    async fn handle_message(&self, history: &[TaskMessage]) -> Result<String, String> {
        let message = history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .ok_or_else(|| "no user message to route".to_string())?;
        Ok(self.route(&message.content).await.reply_text())
    }
}
