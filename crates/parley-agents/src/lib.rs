//! # Parley Agents
//!
//! Ready-made agents for the Parley runtime:
//!
//! - [`CalculatorAgent`] - arithmetic and linear equations
//! - [`TranslatorAgent`] - a small phrase table for three languages
//! - [`OrchestratorAgent`] - routes requests to registered peers
//!
//! Each one implements [`parley_a2a::AgentHandler`] and can be served with
//! [`parley_a2a::AgentServer`].
//!
//! ```rust
//! use parley_a2a::AgentHandler;
//! use parley_agents::{AgentKind, CalculatorAgent};
//!
//! let kind = AgentKind::Calculator;
//! let agent = CalculatorAgent::new(kind.default_url("localhost"));
//! assert_eq!(agent.agent_card().name, kind.display_name());
//! ```

pub mod calculator;
pub mod kind;
pub mod orchestrator;
pub mod translator;

pub use calculator::{CalcError, CalcResult, CalculatorAgent};
pub use kind::{AgentKind, UnknownAgentKind};
pub use orchestrator::OrchestratorAgent;
pub use translator::{Language, TranslatorAgent, UnsupportedLanguage};
