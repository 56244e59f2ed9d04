//! # Parley
//!
//! Agent-to-agent JSON-RPC runtime together with the demo agents built on
//! it. This crate only re-exports the workspace members:
//!
//! - [`a2a`] - envelopes, task store, dispatcher, client, router and server
//! - [`agents`] - calculator, translator and orchestrator agents
//!
//! Run an agent with the `parley` binary from `parley-cli`:
//!
//! ```text
//! parley serve calculator
//! parley serve translator
//! parley serve orchestrator --peer http://localhost:5001 --peer http://localhost:5002
//! parley chat http://localhost:5003 "what is 25 * 4"
//! ```

pub use parley_a2a as a2a;
pub use parley_agents as agents;

pub use parley_a2a::{
    A2aError, A2aResult, AgentCard, AgentClient, AgentHandler, AgentServer, ClientConfig,
    Dispatcher, OrchestrationRouter, Task, TaskMessage, TaskStatus, TaskStore,
};
pub use parley_agents::{AgentKind, CalculatorAgent, OrchestratorAgent, TranslatorAgent};
