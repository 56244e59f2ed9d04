//! Remote Client
//!
//! Outbound caller used by command-line tools and by the orchestrator to reach
//! peer agents. Every logical call is one JSON-RPC round-trip over HTTP POST
//! to the peer's base address. [`AgentClient::chat`] and
//! [`AgentClient::chat_in_task`] are the composite calls: they look up or
//! create a task, then send one message.
//!
//! # Failure model
//!
//! | Situation | Error |
//! |-----------|-------|
//! | Connection refused, DNS failure | `A2aError::Connection` |
//! | No answer within `ClientConfig::timeout` | `A2aError::Timeout` |
//! | Non-2xx status without an error envelope | `A2aError::HttpStatus` |
//! | Body is not a response envelope | `A2aError::MalformedResponse` |
//! | Peer returned an error envelope | `A2aError::Remote` |
//! | Chat message was not recorded as a new turn | `A2aError::MessageNotProcessed` |
//!
//! The client never retries. A timed-out call leaves the remote side in
//! whatever state it reached.
//!
//! # Example
//!
//! ```rust,ignore
//! use parley_a2a::client::{AgentClient, ClientConfig};
//!
//! let client = AgentClient::new(ClientConfig::default())?;
//! let reply = client.chat("http://localhost:5001", "25 * 4").await?;
//! assert!(reply.contains("100"));
//! ```

use crate::envelope::{self, Envelope, RequestId, RpcOutcome, RpcRequest};
use crate::error::{A2aError, A2aResult};
use crate::types::{AgentCard, Metadata, MessageRole, Task, TaskSummary};
use reqwest::{Client, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default timeout for a single round-trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on one HTTP round-trip
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("parley-a2a/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Body of a peer's `GET /health` answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub agent: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Deserialize)]
struct TaskList {
    tasks: Vec<TaskSummary>,
}

/// JSON-RPC client for peer agents
///
/// Cheap to clone; clones share the connection pool and the request id
/// counter.
#[derive(Clone)]
pub struct AgentClient {
    http: Client,
    config: ClientConfig,
    next_id: Arc<AtomicI64>,
}

impl std::fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClient")
            .field("timeout", &self.config.timeout)
            .field("user_agent", &self.config.user_agent)
            .finish()
    }
}

impl AgentClient {
    pub fn new(config: ClientConfig) -> A2aResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| A2aError::connection(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            next_id: Arc::new(AtomicI64::new(1)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn transport_error(&self, err: reqwest::Error) -> A2aError {
        if err.is_timeout() {
            A2aError::Timeout {
                timeout_ms: self.timeout_ms(),
            }
        } else {
            A2aError::connection(err.to_string())
        }
    }

    /// Perform one RPC round-trip and return the raw result value
    pub async fn call(
        &self,
        address: &str,
        method: &str,
        params: Option<Value>,
    ) -> A2aResult<Value> {
        let url = Url::parse(address)?;
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let body = envelope::encode(&Envelope::Request(RpcRequest::new(
            method,
            params,
            id.clone(),
        )))?;

        debug!(url = %url, method = %method, id = %id, "Sending request");

        let response = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        let http_status = || A2aError::HttpStatus {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        };

        match envelope::decode(&bytes) {
            Ok(Envelope::Response(reply)) => match reply.outcome {
                RpcOutcome::Failure(err) => Err(A2aError::Remote(err)),
                RpcOutcome::Success(_) if !status.is_success() => Err(http_status()),
                RpcOutcome::Success(_) if reply.id != id => {
                    Err(A2aError::malformed_response(format!(
                        "response id {} does not match request id {id}",
                        reply.id
                    )))
                }
                RpcOutcome::Success(value) => Ok(value),
            },
            _ if !status.is_success() => Err(http_status()),
            Ok(Envelope::Request(_)) => Err(A2aError::malformed_response(
                "peer answered with a request envelope",
            )),
            Err(err) => Err(A2aError::malformed_response(err.to_string())),
        }
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        address: &str,
        method: &str,
        params: Option<Value>,
    ) -> A2aResult<T> {
        let value = self.call(address, method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| A2aError::malformed_response(format!("{method} result: {e}")))
    }

    /// Fetch and validate a peer's agent card
    pub async fn fetch_agent_card(&self, address: &str) -> A2aResult<AgentCard> {
        let card: AgentCard = self.call_typed(address, "getAgentCard", None).await?;
        card.validate()?;
        info!(
            address = %address,
            name = %card.name,
            skills = card.skills.len(),
            "Fetched agent card"
        );
        Ok(card)
    }

    pub async fn create_task(
        &self,
        address: &str,
        task_id: Option<&str>,
        metadata: Option<Metadata>,
    ) -> A2aResult<Task> {
        let mut params = Map::new();
        if let Some(task_id) = task_id {
            params.insert("task_id".into(), json!(task_id));
        }
        if let Some(metadata) = metadata {
            params.insert("metadata".into(), json!(metadata));
        }
        self.call_typed(address, "createTask", Some(Value::Object(params)))
            .await
    }

    /// Send one message; returns the task with its updated status and history
    pub async fn send_task_message(
        &self,
        address: &str,
        task_id: &str,
        role: MessageRole,
        content: &str,
    ) -> A2aResult<Task> {
        let params = json!({ "task_id": task_id, "role": role, "content": content });
        self.call_typed(address, "sendTaskMessage", Some(params))
            .await
    }

    pub async fn get_task(&self, address: &str, task_id: &str) -> A2aResult<Task> {
        self.call_typed(address, "getTask", Some(json!({ "task_id": task_id })))
            .await
    }

    pub async fn list_tasks(&self, address: &str) -> A2aResult<Vec<TaskSummary>> {
        let list: TaskList = self.call_typed(address, "listTasks", None).await?;
        Ok(list.tasks)
    }

    /// Start a fresh task, send `text`, and return the agent's reply
    pub async fn chat(&self, address: &str, text: &str) -> A2aResult<String> {
        let task = self.create_task(address, None, None).await?;
        self.converse(address, &task, text).await
    }

    /// Send `text` to an existing task and return the reply it produced.
    ///
    /// A task that already reached a terminal state ignores new messages, so
    /// this fails with `A2aError::MessageNotProcessed` instead of handing back
    /// an earlier turn's reply.
    pub async fn chat_in_task(&self, address: &str, task_id: &str, text: &str) -> A2aResult<String> {
        let task = self.get_task(address, task_id).await?;
        self.converse(address, &task, text).await
    }

    /// Send `text` to `before` and read the agent reply recorded after it
    async fn converse(&self, address: &str, before: &Task, text: &str) -> A2aResult<String> {
        if before.is_terminal() {
            return Err(A2aError::message_not_processed(
                &before.task_id,
                before.status,
            ));
        }
        let after = self
            .send_task_message(address, &before.task_id, MessageRole::User, text)
            .await?;

        let new_turn = after.messages.get(before.messages.len()..).unwrap_or_default();
        let Some(sent) = new_turn
            .iter()
            .position(|m| m.role == MessageRole::User && m.content == text)
        else {
            return Err(A2aError::message_not_processed(
                &after.task_id,
                after.status,
            ));
        };
        new_turn[sent + 1..]
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Agent)
            .map(|m| m.content.clone())
            .ok_or_else(|| {
                A2aError::malformed_response(format!("task {} has no agent reply", after.task_id))
            })
    }

    /// Query a peer's liveness probe
    pub async fn health(&self, address: &str) -> A2aResult<HealthStatus> {
        let url = Url::parse(address)?.join("/health")?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(A2aError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| A2aError::malformed_response(format!("health: {e}")))
    }
}
