//! Built-in agent kinds and their well-known endpoints

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown agent kind '{0}' (expected calculator, translator or orchestrator)")]
pub struct UnknownAgentKind(pub String);

/// The agents this crate ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Calculator,
    Translator,
    Orchestrator,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [
        AgentKind::Calculator,
        AgentKind::Translator,
        AgentKind::Orchestrator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Calculator => "calculator",
            AgentKind::Translator => "translator",
            AgentKind::Orchestrator => "orchestrator",
        }
    }

    /// Name the agent advertises on its card
    pub fn display_name(self) -> &'static str {
        match self {
            AgentKind::Calculator => crate::CalculatorAgent::NAME,
            AgentKind::Translator => crate::TranslatorAgent::NAME,
            AgentKind::Orchestrator => crate::OrchestratorAgent::NAME,
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            AgentKind::Calculator => 5001,
            AgentKind::Translator => 5002,
            AgentKind::Orchestrator => 5003,
        }
    }

    /// Base URL of this agent on `host` at its default port
    pub fn default_url(self, host: &str) -> String {
        format!("http://{host}:{}", self.default_port())
    }

    /// Look a kind up by the name on its card
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.display_name() == name)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = UnknownAgentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted || k.display_name().to_lowercase() == wanted)
            .ok_or_else(|| UnknownAgentKind(s.to_string()))
    }
}
