//! In-memory Task Store
//!
//! The store owns every task an agent knows about for the lifetime of the
//! process. It is independent of any transport: the dispatcher drives it, but
//! it can be used directly.
//!
//! # Locking
//!
//! The index maps ids to per-task slots and remembers creation order. Each
//! slot carries the task state behind its own `RwLock` and a driver `Mutex`.
//! Only one caller at a time may drive a task through
//! [`TaskStore::process_message`]; tasks with different ids proceed
//! concurrently. Appending the user message and entering `in_progress` happen
//! under a single write guard.

use crate::error::{A2aError, A2aResult};
use crate::types::{Metadata, MessageRole, Task, TaskMessage, TaskStatus, TaskSummary, Transition};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct TaskSlot {
    state: RwLock<Task>,
    driver: Mutex<()>,
}

impl TaskSlot {
    fn new(task: Task) -> Self {
        Self {
            state: RwLock::new(task),
            driver: Mutex::new(()),
        }
    }
}

#[derive(Debug, Default)]
struct Index {
    slots: HashMap<String, Arc<TaskSlot>>,
    order: Vec<String>,
}

/// Result of driving a task with one message
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// The handler replied and the task is now `completed`
    Completed { task: Task, reply: String },
    /// The task was already terminal; nothing was appended
    AlreadyTerminal { task: Task },
}

impl Processed {
    pub fn task(&self) -> &Task {
        match self {
            Processed::Completed { task, .. } | Processed::AlreadyTerminal { task } => task,
        }
    }

    pub fn into_task(self) -> Task {
        match self {
            Processed::Completed { task, .. } | Processed::AlreadyTerminal { task } => task,
        }
    }
}

/// In-memory task store
#[derive(Debug, Default)]
pub struct TaskStore {
    index: RwLock<Index>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, task_id: &str) -> A2aResult<Arc<TaskSlot>> {
        self.index
            .read()
            .await
            .slots
            .get(task_id)
            .cloned()
            .ok_or_else(|| A2aError::task_not_found(task_id))
    }

    /// Create a task, generating a UUID when no id is given.
    ///
    /// A duplicate id fails with `TaskExists` and leaves the existing task
    /// untouched.
    pub async fn create_task(
        &self,
        task_id: Option<String>,
        metadata: Option<Metadata>,
    ) -> A2aResult<Task> {
        let task = match task_id {
            Some(id) if id.trim().is_empty() => {
                return Err(A2aError::invalid_params("task_id must not be empty"));
            }
            Some(id) => Task::new(id),
            None => Task::new_with_uuid(),
        }
        .with_metadata(metadata.unwrap_or_default());

        let mut index = self.index.write().await;
        if index.slots.contains_key(&task.task_id) {
            return Err(A2aError::task_exists(&task.task_id));
        }
        index
            .slots
            .insert(task.task_id.clone(), Arc::new(TaskSlot::new(task.clone())));
        index.order.push(task.task_id.clone());
        drop(index);

        info!(task_id = %task.task_id, "Task created");
        Ok(task)
    }

    /// Append a message without touching the task status
    pub async fn append_message(
        &self,
        task_id: &str,
        role: MessageRole,
        content: impl Into<String>,
    ) -> A2aResult<TaskMessage> {
        let slot = self.slot(task_id).await?;
        let message = TaskMessage::new(role, content);
        slot.state.write().await.add_message(message.clone());
        debug!(task_id = %task_id, role = %role, "Message appended");
        Ok(message)
    }

    /// Snapshot of a task with its full history
    pub async fn get_task(&self, task_id: &str) -> A2aResult<Task> {
        let slot = self.slot(task_id).await?;
        let task = slot.state.read().await.clone();
        Ok(task)
    }

    /// Summaries of every task, in creation order
    pub async fn list_tasks(&self) -> Vec<TaskSummary> {
        let slots: Vec<Arc<TaskSlot>> = {
            let index = self.index.read().await;
            index
                .order
                .iter()
                .filter_map(|id| index.slots.get(id).cloned())
                .collect()
        };

        let mut summaries = Vec::with_capacity(slots.len());
        for slot in slots {
            summaries.push(slot.state.read().await.summary());
        }
        summaries
    }

    /// Request a status change; illegal moves are reported as `Unchanged`
    pub async fn set_status(&self, task_id: &str, status: TaskStatus) -> A2aResult<Transition> {
        let slot = self.slot(task_id).await?;
        let transition = slot.state.write().await.advance(status);
        if !transition.is_advanced() {
            debug!(task_id = %task_id, requested = %status, kept = %transition.status(), "Status unchanged");
        }
        Ok(transition)
    }

    /// Drive a task with one incoming message.
    ///
    /// The message is appended and the task enters `in_progress` atomically,
    /// then `handler` is called with a snapshot of the full history. A reply
    /// is appended as an `agent` message and completes the task; a failure
    /// appends a `system` note, fails the task and is returned as
    /// `HandlerFailure`. A terminal task is returned unchanged without
    /// calling the handler.
    pub async fn process_message<F, Fut>(
        &self,
        task_id: &str,
        message: TaskMessage,
        handler: F,
    ) -> A2aResult<Processed>
    where
        F: FnOnce(Vec<TaskMessage>) -> Fut,
        Fut: Future<Output = Result<String, String>>,
    {
        let slot = self.slot(task_id).await?;
        let _driver = slot.driver.lock().await;

        let history = {
            let mut task = slot.state.write().await;
            if task.is_terminal() {
                debug!(task_id = %task_id, status = %task.status, "Message to terminal task ignored");
                return Ok(Processed::AlreadyTerminal { task: task.clone() });
            }
            task.add_message(message);
            task.advance(TaskStatus::InProgress);
            task.messages.clone()
        };

        match handler(history).await {
            Ok(reply) => {
                let mut task = slot.state.write().await;
                task.add_message(TaskMessage::agent(reply.clone()));
                task.advance(TaskStatus::Completed);
                info!(task_id = %task_id, messages = task.messages.len(), "Task completed");
                Ok(Processed::Completed {
                    task: task.clone(),
                    reply,
                })
            }
            Err(cause) => {
                let mut task = slot.state.write().await;
                task.add_message(TaskMessage::system(format!(
                    "Error processing task: {cause}"
                )));
                task.advance(TaskStatus::Failed);
                warn!(task_id = %task_id, error = %cause, "Task failed");
                Err(A2aError::handler_failure(task_id, cause))
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
