//! Task types and the task lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Free-form metadata attached to tasks and messages
pub type Metadata = HashMap<String, serde_json::Value>;

/// A task is one conversation between a caller and an agent.
///
/// Tasks progress through [`TaskStatus`] values and keep an append-only,
/// ordered history of [`TaskMessage`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for the task
    pub task_id: String,

    /// Current status of the task
    pub status: TaskStatus,

    /// Messages exchanged during the task
    #[serde(default)]
    pub messages: Vec<TaskMessage>,

    /// Additional metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task with the given ID
    pub fn new(task_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Pending,
            messages: Vec::new(),
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new task with a generated UUID
    pub fn new_with_uuid() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add a message to the task
    pub fn add_message(&mut self, message: TaskMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Move the task to `status` if the lifecycle allows it.
    ///
    /// Disallowed moves leave the task untouched and report
    /// [`Transition::Unchanged`]; a terminal task stays terminal.
    pub fn advance(&mut self, status: TaskStatus) -> Transition {
        let from = self.status;
        if !from.can_transition_to(status) {
            return Transition::Unchanged(from);
        }
        self.status = status;
        self.updated_at = Utc::now();
        Transition::Advanced { from, to: status }
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Content of the most recent agent message, if any
    pub fn last_agent_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Agent)
            .map(|m| m.content.as_str())
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.task_id.clone(),
            status: self.status,
            message_count: self.messages.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            metadata: self.metadata.clone(),
        }
    }
}

/// Outcome of a status change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The status moved forward
    Advanced { from: TaskStatus, to: TaskStatus },
    /// The request was a no-op; carries the status the task kept
    Unchanged(TaskStatus),
}

impl Transition {
    pub fn is_advanced(&self) -> bool {
        matches!(self, Transition::Advanced { .. })
    }

    /// Status the task has after the request
    pub fn status(&self) -> TaskStatus {
        match self {
            Transition::Advanced { to, .. } => *to,
            Transition::Unchanged(status) => *status,
        }
    }
}

/// Task status indicating the current state in the task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, no message processed yet
    Pending,

    /// A message is being processed
    InProgress,

    /// Task completed successfully
    Completed,

    /// Task failed due to an error
    Failed,
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Completed | TaskStatus::Failed => 2,
        }
    }

    /// Check if this status represents a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Only forward moves are legal; terminal states accept nothing.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Role of a message author within a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[default]
    User,
    Agent,
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Agent => write!(f, "agent"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// A single message in a task's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TaskMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Agent, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Compact view of a task, as returned by `listTasks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub status: TaskStatus,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}
