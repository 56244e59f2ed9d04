//! Capability Registry
//!
//! Holds this agent's own [`AgentCard`] and, for orchestrating agents, the
//! ordered set of known peers. Peers keep the order in which they were first
//! registered; registering a card under a name that is already known replaces
//! that peer in place.

use crate::error::A2aResult;
use crate::types::AgentCard;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A known peer: the address it was registered from and its advertised card
#[derive(Debug, Clone, PartialEq)]
pub struct PeerEntry {
    /// Base URL used to reach the peer
    pub address: String,
    pub card: Arc<AgentCard>,
}

impl PeerEntry {
    pub fn name(&self) -> &str {
        &self.card.name
    }
}

/// Whether a registration added a new peer or replaced a known one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    Replaced,
}

/// Registry of the local card and known peer cards
#[derive(Debug)]
pub struct CapabilityRegistry {
    own: Arc<AgentCard>,
    peers: RwLock<Vec<PeerEntry>>,
}

impl CapabilityRegistry {
    pub fn new(own: AgentCard) -> Self {
        Self {
            own: Arc::new(own),
            peers: RwLock::new(Vec::new()),
        }
    }

    /// This agent's own card
    pub fn own_card(&self) -> Arc<AgentCard> {
        Arc::clone(&self.own)
    }

    /// Register a peer card reached at `address`.
    ///
    /// The card is validated first; an invalid card leaves the registry
    /// untouched.
    pub async fn register(
        &self,
        address: impl Into<String>,
        card: AgentCard,
    ) -> A2aResult<Registration> {
        card.validate()?;
        let entry = PeerEntry {
            address: address.into(),
            card: Arc::new(card),
        };

        let mut peers = self.peers.write().await;
        if let Some(existing) = peers.iter_mut().find(|p| p.card.name == entry.card.name) {
            debug!(peer = %entry.card.name, address = %entry.address, "Replacing peer card");
            *existing = entry;
            return Ok(Registration::Replaced);
        }

        info!(
            peer = %entry.card.name,
            address = %entry.address,
            skills = entry.card.skills.len(),
            "Registered peer"
        );
        peers.push(entry);
        Ok(Registration::Added)
    }

    /// Remove a peer by name
    pub async fn remove(&self, name: &str) -> Option<PeerEntry> {
        let mut peers = self.peers.write().await;
        let index = peers.iter().position(|p| p.card.name == name)?;
        Some(peers.remove(index))
    }

    pub async fn get(&self, name: &str) -> Option<PeerEntry> {
        self.peers
            .read()
            .await
            .iter()
            .find(|p| p.card.name == name)
            .cloned()
    }

    /// Snapshot of all peers in registration order
    pub async fn peers(&self) -> Vec<PeerEntry> {
        self.peers.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}
