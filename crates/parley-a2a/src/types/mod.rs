//! Protocol Data Types
//!
//! - [`agent_card`] - capability advertisement
//! - [`task`] - task lifecycle, messages and summaries

mod agent_card;
mod task;

pub use agent_card::{AgentCard, DEFAULT_CARD_VERSION, InteractionMode, ParameterSpec, Skill};
pub use task::{Metadata, MessageRole, Task, TaskMessage, TaskStatus, TaskSummary, Transition};
