//! Orchestration Router
//!
//! Picks the peer skill that best matches a piece of free text and forwards
//! the text to that peer in a single `chat` round-trip.
//!
//! # Selection
//!
//! 1. The input is trimmed and lowercased.
//! 2. Discovery phrases ("list agents", "discover agents", "what agents") are
//!    answered locally from the registry.
//! 3. Every skill of every peer is scored by the number of its distinct
//!    keywords found in the input. A skill's keywords are its
//!    [`KeywordTable`] entry plus its own name with `_` read as a space.
//! 4. The highest score wins. Ties go to the peer registered first, then to
//!    the skill listed first on its card.
//! 5. A best score of zero is a [`RouteOutcome::NoMatch`] and makes no
//!    outbound call.

use crate::error::A2aResult;
use crate::registry::{CapabilityRegistry, PeerEntry, Registration};
use crate::types::AgentCard;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phrases that ask the orchestrator to describe its peers
pub const META_QUERIES: [&str; 3] = ["list agents", "discover agents", "what agents"];

/// Outbound side of the router
#[async_trait]
pub trait PeerInvoker: Send + Sync {
    /// Fetch and validate the card of the agent at `address`
    async fn fetch_card(&self, address: &str) -> A2aResult<AgentCard>;

    /// Run one conversation turn with the agent at `address`
    async fn chat(&self, address: &str, text: &str) -> A2aResult<String>;
}

#[cfg(feature = "client")]
#[async_trait]
impl PeerInvoker for crate::client::AgentClient {
    async fn fetch_card(&self, address: &str) -> A2aResult<AgentCard> {
        self.fetch_agent_card(address).await
    }

    async fn chat(&self, address: &str, text: &str) -> A2aResult<String> {
        crate::client::AgentClient::chat(self, address, text).await
    }
}

/// Routing vocabulary per skill name
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordTable {
    entries: Vec<(String, Vec<String>)>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::empty()
            .with_keywords("calculate", ["calculate", "what is", "+", "-", "*", "/"])
            .with_keywords("solve_equation", ["solve", "equation", "="])
            .with_keywords("translate", ["translate", "spanish", "french", "german"])
    }
}

impl KeywordTable {
    /// A table with no entries; skills match on their own names only
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set the keywords for `skill`, replacing any previous entry
    pub fn with_keywords<I, S>(mut self, skill: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let skill = skill.into();
        let words: Vec<String> = words
            .into_iter()
            .map(|w| w.into().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        match self.entries.iter_mut().find(|(name, _)| *name == skill) {
            Some(entry) => entry.1 = words,
            None => self.entries.push((skill, words)),
        }
        self
    }

    /// Distinct keywords for a skill, including its own name
    pub fn keywords_for(&self, skill: &str) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();
        let configured = self
            .entries
            .iter()
            .find(|(name, _)| name == skill)
            .map(|(_, words)| words.as_slice())
            .unwrap_or_default();

        let own_name = skill.replace('_', " ").trim().to_lowercase();
        for word in configured.iter().cloned().chain(std::iter::once(own_name)) {
            if !word.is_empty() && !keywords.contains(&word) {
                keywords.push(word);
            }
        }
        keywords
    }

    /// Number of distinct keywords of `skill` present in `normalized`
    pub fn score(&self, skill: &str, normalized: &str) -> usize {
        self.keywords_for(skill)
            .iter()
            .filter(|k| normalized.contains(k.as_str()))
            .count()
    }
}

/// The peer skill chosen for an input
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub peer: PeerEntry,
    pub skill: String,
    pub score: usize,
}

/// Result of routing one input
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// A discovery query answered locally
    MetaQuery { listing: String },
    /// The chosen peer replied
    Routed {
        peer: String,
        skill: String,
        reply: String,
    },
    /// No peer skill matched; no call was made
    NoMatch { known_peers: Vec<String> },
    /// The chosen peer could not be reached or failed
    PeerUnavailable {
        peer: String,
        skill: String,
        reason: String,
    },
}

impl RouteOutcome {
    /// User-facing text for this outcome
    pub fn reply_text(&self) -> String {
        match self {
            RouteOutcome::MetaQuery { listing } => listing.clone(),
            RouteOutcome::Routed { peer, reply, .. } => format!("{peer}: {reply}"),
            RouteOutcome::NoMatch { known_peers } if known_peers.is_empty() => {
                "No matching agent for this request. No agents are currently registered."
                    .to_string()
            }
            RouteOutcome::NoMatch { known_peers } => format!(
                "No matching agent for this request. Available agents: {}",
                known_peers.join(", ")
            ),
            RouteOutcome::PeerUnavailable { peer, reason, .. } => {
                format!("{peer} is unavailable: {reason}")
            }
        }
    }
}

/// Lowercase and trim an input before matching
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Capability-matching router over a registry of peers
pub struct OrchestrationRouter {
    registry: Arc<CapabilityRegistry>,
    invoker: Arc<dyn PeerInvoker>,
    keywords: KeywordTable,
}

impl std::fmt::Debug for OrchestrationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationRouter")
            .field("registry", &self.registry)
            .field("keywords", &self.keywords)
            .finish()
    }
}

impl OrchestrationRouter {
    pub fn new(registry: Arc<CapabilityRegistry>, invoker: Arc<dyn PeerInvoker>) -> Self {
        Self {
            registry,
            invoker,
            keywords: KeywordTable::default(),
        }
    }

    pub fn with_keyword_table(mut self, keywords: KeywordTable) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    /// Fetch the card of the agent at `address` and add it as a peer
    pub async fn register_peer(&self, address: &str) -> A2aResult<Registration> {
        let card = self.invoker.fetch_card(address).await?;
        self.registry.register(address, card).await
    }

    /// Choose the best peer skill for an already normalized input
    pub async fn select(&self, normalized: &str) -> Option<Selection> {
        let mut best: Option<Selection> = None;
        for peer in self.registry.peers().await {
            for skill in &peer.card.skills {
                let score = self.keywords.score(&skill.name, normalized);
                if score > best.as_ref().map_or(0, |b| b.score) {
                    best = Some(Selection {
                        peer: peer.clone(),
                        skill: skill.name.clone(),
                        score,
                    });
                }
            }
        }
        best
    }

    /// Describe every known peer and its skills
    pub async fn listing(&self) -> String {
        let peers = self.registry.peers().await;
        if peers.is_empty() {
            return "No agents are currently registered. Start the orchestrator with --peer <url> to register agents.".to_string();
        }

        let mut text = format!("I have access to {} agent(s):\n", peers.len());
        for peer in &peers {
            text.push_str(&format!(
                "\n**{}**\n  Description: {}\n  Skills:\n",
                peer.card.name, peer.card.description
            ));
            for skill in &peer.card.skills {
                text.push_str(&format!("    - {}: {}\n", skill.name, skill.description));
            }
        }
        text
    }

    /// Route one piece of free text
    pub async fn route(&self, input: &str) -> RouteOutcome {
        let normalized = normalize(input);

        if META_QUERIES.iter().any(|q| normalized.contains(q)) {
            debug!("Answering discovery query locally");
            return RouteOutcome::MetaQuery {
                listing: self.listing().await,
            };
        }

        let Some(selection) = self.select(&normalized).await else {
            let known_peers = self
                .registry
                .peers()
                .await
                .iter()
                .map(|p| p.card.name.clone())
                .collect();
            debug!("No peer skill matched input");
            return RouteOutcome::NoMatch { known_peers };
        };

        let peer = selection.peer.card.name.clone();
        info!(
            peer = %peer,
            skill = %selection.skill,
            score = selection.score,
            "Routing request"
        );

        match self
            .invoker
            .chat(&selection.peer.address, input.trim())
            .await
        {
            Ok(reply) => RouteOutcome::Routed {
                peer,
                skill: selection.skill,
                reply,
            },
            Err(err) => {
                warn!(peer = %peer, error = %err, "Peer call failed");
                RouteOutcome::PeerUnavailable {
                    peer,
                    skill: selection.skill,
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::A2aError;
    use crate::types::Skill;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Invoker backed by fixed cards; records every chat call
    #[derive(Default)]
    struct FakeInvoker {
        cards: HashMap<String, AgentCard>,
        down: Vec<String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeInvoker {
        fn with_card(mut self, address: &str, card: AgentCard) -> Self {
            self.cards.insert(address.to_string(), card);
            self
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PeerInvoker for FakeInvoker {
        async fn fetch_card(&self, address: &str) -> A2aResult<AgentCard> {
            self.cards
                .get(address)
                .cloned()
                .ok_or_else(|| A2aError::connection(format!("nothing at {address}")))
        }

        async fn chat(&self, address: &str, text: &str) -> A2aResult<String> {
            self.calls
                .lock()
                .unwrap()
                .push((address.to_string(), text.to_string()));
            if self.down.iter().any(|d| d == address) {
                return Err(A2aError::connection("connection refused"));
            }
            Ok(format!("handled '{text}'"))
        }
    }

    fn calculator() -> AgentCard {
        AgentCard::new("CalculatorAgent", "Math", "http://calc:5001")
            .with_skill(Skill::new("calculate", "Evaluate expressions"))
            .with_skill(Skill::new("solve_equation", "Solve linear equations"))
    }

    fn translator() -> AgentCard {
        AgentCard::new("TranslatorAgent", "Words", "http://tr:5002")
            .with_skill(Skill::new("translate", "Translate phrases"))
    }

    fn orchestrator_card() -> AgentCard {
        AgentCard::new("OrchestratorAgent", "Routes", "http://orch:5003")
    }

    async fn router_with(invoker: Arc<FakeInvoker>, addresses: &[&str]) -> OrchestrationRouter {
        let registry = Arc::new(CapabilityRegistry::new(orchestrator_card()));
        let router = OrchestrationRouter::new(registry, invoker);
        for address in addresses {
            router.register_peer(address).await.unwrap();
        }
        router
    }

    #[test]
    fn test_keywords_include_skill_name() {
        let table = KeywordTable::default();
        let keywords = table.keywords_for("solve_equation");
        assert_eq!(keywords, vec!["solve", "equation", "=", "solve equation"]);
        assert_eq!(table.keywords_for("calculate").len(), 6);
        assert_eq!(table.keywords_for("unknown_skill"), vec!["unknown skill"]);
    }

    #[test]
    fn test_score_counts_distinct_keywords() {
        let table = KeywordTable::default();
        assert_eq!(table.score("solve_equation", "solve the equation x + 1 = 2"), 3);
        assert_eq!(table.score("translate", "translate hello to spanish"), 2);
        assert_eq!(table.score("calculate", "translate hello to spanish"), 0);
    }

    #[test]
    fn test_custom_keywords_replace_entry() {
        let table = KeywordTable::default().with_keywords("translate", ["Italian "]);
        assert_eq!(table.keywords_for("translate"), vec!["italian", "translate"]);
    }

    #[tokio::test]
    async fn test_routes_to_best_skill() {
        let invoker = Arc::new(
            FakeInvoker::default()
                .with_card("http://calc", calculator())
                .with_card("http://tr", translator()),
        );
        let router = router_with(Arc::clone(&invoker), &["http://calc", "http://tr"]).await;

        let outcome = router.route("  Translate hello to Spanish ").await;
        assert_eq!(
            outcome,
            RouteOutcome::Routed {
                peer: "TranslatorAgent".into(),
                skill: "translate".into(),
                reply: "handled 'Translate hello to Spanish'".into(),
            }
        );
        assert_eq!(
            outcome.reply_text(),
            "TranslatorAgent: handled 'Translate hello to Spanish'"
        );
        assert_eq!(invoker.calls().len(), 1);
        assert_eq!(invoker.calls()[0].0, "http://tr");
    }

    #[tokio::test]
    async fn test_equation_prefers_solver() {
        let invoker = Arc::new(FakeInvoker::default().with_card("http://calc", calculator()));
        let router = router_with(invoker, &["http://calc"]).await;

        let selection = router.select("solve x + 10 = 25").await.unwrap();
        assert_eq!(selection.skill, "solve_equation");
    }

    #[tokio::test]
    async fn test_no_match_makes_no_call() {
        let invoker = Arc::new(FakeInvoker::default().with_card("http://calc", calculator()));
        let router = router_with(Arc::clone(&invoker), &["http://calc"]).await;

        let outcome = router.route("translate hello to spanish").await;
        assert_eq!(
            outcome,
            RouteOutcome::NoMatch {
                known_peers: vec!["CalculatorAgent".into()]
            }
        );
        assert!(outcome.reply_text().to_lowercase().contains("no matching agent"));
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ties_go_to_first_registered_peer() {
        let twin = AgentCard::new("TwinCalculator", "Math again", "http://twin:1")
            .with_skill(Skill::new("calculate", "Evaluate expressions"));
        let invoker = Arc::new(
            FakeInvoker::default()
                .with_card("http://calc", calculator())
                .with_card("http://twin", twin),
        );
        let router = router_with(invoker, &["http://calc", "http://twin"]).await;

        for _ in 0..10 {
            let selection = router.select("2 + 2").await.unwrap();
            assert_eq!(selection.peer.card.name, "CalculatorAgent");
            assert_eq!(selection.skill, "calculate");
        }
    }

    #[tokio::test]
    async fn test_meta_query_is_local() {
        let invoker = Arc::new(FakeInvoker::default().with_card("http://calc", calculator()));
        let router = router_with(Arc::clone(&invoker), &["http://calc"]).await;

        let outcome = router.route("What agents do you know? 1 + 1").await;
        let RouteOutcome::MetaQuery { listing } = &outcome else {
            panic!("expected listing, got {outcome:?}");
        };
        assert!(listing.contains("**CalculatorAgent**"));
        assert!(listing.contains("- solve_equation: Solve linear equations"));
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_meta_query_without_peers() {
        let router = router_with(Arc::new(FakeInvoker::default()), &[]).await;
        let outcome = router.route("list agents").await;
        assert!(outcome.reply_text().starts_with("No agents are currently registered"));
    }

    #[tokio::test]
    async fn test_peer_failure_becomes_unavailable() {
        let mut invoker = FakeInvoker::default().with_card("http://calc", calculator());
        invoker.down.push("http://calc".into());
        let router = router_with(Arc::new(invoker), &["http://calc"]).await;

        let outcome = router.route("calculate 1 + 1").await;
        assert!(matches!(outcome, RouteOutcome::PeerUnavailable { ref peer, .. } if peer == "CalculatorAgent"));
        assert!(outcome.reply_text().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_register_unreachable_peer_fails() {
        let router = router_with(Arc::new(FakeInvoker::default()), &[]).await;
        assert!(router.register_peer("http://nowhere").await.is_err());
        assert!(router.registry().is_empty().await);
    }
}
