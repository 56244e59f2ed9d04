//! RPC Dispatcher
//!
//! Maps a method name to one of the built-in task methods and routes
//! user-directed messages to the agent's domain hook, the [`AgentHandler`].
//! The dispatcher is generic over the handler and never inspects which
//! concrete agent it serves.
//!
//! # Example
//!
//! ```rust
//! use parley_a2a::{AgentCard, AgentHandler, Dispatcher, TaskMessage, TaskStore};
//! use parley_a2a::envelope::RpcRequest;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl AgentHandler for Echo {
//!     fn agent_card(&self) -> AgentCard {
//!         AgentCard::new("EchoAgent", "Repeats the last message", "http://localhost:5000")
//!     }
//!
//!     async fn handle_message(&self, history: &[TaskMessage]) -> Result<String, String> {
//!         history
//!             .last()
//!             .map(|m| m.content.clone())
//!             .ok_or_else(|| "empty history".to_string())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let dispatcher = Dispatcher::new(Echo, Arc::new(TaskStore::new()));
//! let response = dispatcher.dispatch(RpcRequest::new("listTasks", None, 1)).await;
//! assert_eq!(response.result().unwrap()["tasks"], serde_json::json!([]));
//! # });
//! ```

use crate::envelope::{self, Envelope, RequestId, RpcError, RpcRequest, RpcResponse};
use crate::error::{A2aError, A2aResult, ErrorCode};
use crate::registry::CapabilityRegistry;
use crate::store::TaskStore;
use crate::types::{AgentCard, Metadata, MessageRole, TaskMessage};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Domain behaviour of an agent
#[async_trait]
pub trait AgentHandler: Send + Sync + 'static {
    /// Card describing this agent's capabilities
    fn agent_card(&self) -> AgentCard;

    /// Produce a reply for the task whose full history is `history`.
    ///
    /// The last message is the one that triggered the call. An `Err` fails
    /// the task; its text is recorded in the task history.
    async fn handle_message(&self, history: &[TaskMessage]) -> Result<String, String>;
}

/// Methods served by every dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GetAgentCard,
    CreateTask,
    SendTaskMessage,
    GetTask,
    ListTasks,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::GetAgentCard,
        Method::CreateTask,
        Method::SendTaskMessage,
        Method::GetTask,
        Method::ListTasks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::GetAgentCard => "getAgentCard",
            Method::CreateTask => "createTask",
            Method::SendTaskMessage => "sendTaskMessage",
            Method::GetTask => "getTask",
            Method::ListTasks => "listTasks",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of `createTask`
#[derive(Debug, Default, Deserialize)]
pub struct CreateTaskParams {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Parameters of `sendTaskMessage`
#[derive(Debug, Deserialize)]
pub struct SendTaskMessageParams {
    pub task_id: String,
    pub content: String,
    #[serde(default)]
    pub role: MessageRole,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Parameters of `getTask`
#[derive(Debug, Deserialize)]
pub struct GetTaskParams {
    pub task_id: String,
}

/// Validate `params` into a typed struct before anything is mutated.
///
/// Omitted or `null` params read as an empty object.
fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> A2aResult<T> {
    let value = match params {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value @ Value::Object(_)) => value,
        Some(_) => return Err(A2aError::invalid_params("params must be an object")),
    };
    serde_json::from_value(value).map_err(|e| A2aError::invalid_params(e.to_string()))
}

fn to_result<T: serde::Serialize>(value: &T) -> A2aResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| A2aError::internal(format!("Failed to serialize result: {e}")))
}

/// Fallback body used if an error response itself cannot be encoded
const ENCODE_FAILURE_BODY: &[u8] =
    br#"{"jsonrpc":"2.0","error":{"code":3000,"message":"Failed to encode response"},"id":null}"#;

/// JSON-RPC dispatcher for one agent identity
pub struct Dispatcher<H: AgentHandler> {
    handler: Arc<H>,
    store: Arc<TaskStore>,
    registry: Arc<CapabilityRegistry>,
}

impl<H: AgentHandler> Clone for Dispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<H: AgentHandler> Dispatcher<H> {
    /// Create a dispatcher with a fresh registry holding the handler's card
    pub fn new(handler: H, store: Arc<TaskStore>) -> Self {
        let registry = Arc::new(CapabilityRegistry::new(handler.agent_card()));
        Self::with_registry(handler, store, registry)
    }

    /// Create a dispatcher sharing an existing registry
    pub fn with_registry(
        handler: H,
        store: Arc<TaskStore>,
        registry: Arc<CapabilityRegistry>,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            store,
            registry,
        }
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn agent_card(&self) -> Arc<AgentCard> {
        self.registry.own_card()
    }

    /// Handle one request, always producing one response
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let RpcRequest { method, params, id } = request;
        debug!(method = %method, id = %id, "Dispatching request");

        match self.call(&method, params).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(err) => {
                debug!(method = %method, id = %id, error = %err, "Request failed");
                RpcResponse::failure(id, RpcError::from(err))
            }
        }
    }

    async fn call(&self, method: &str, params: Option<Value>) -> A2aResult<Value> {
        let method = Method::from_name(method).ok_or_else(|| A2aError::method_not_found(method))?;

        match method {
            Method::GetAgentCard => to_result(self.registry.own_card().as_ref()),
            Method::CreateTask => {
                let params: CreateTaskParams = parse_params(params)?;
                let task = self
                    .store
                    .create_task(params.task_id, params.metadata)
                    .await?;
                to_result(&task)
            }
            Method::SendTaskMessage => {
                let params: SendTaskMessageParams = parse_params(params)?;
                self.send_task_message(params).await
            }
            Method::GetTask => {
                let params: GetTaskParams = parse_params(params)?;
                to_result(&self.store.get_task(&params.task_id).await?)
            }
            Method::ListTasks => {
                let tasks = self.store.list_tasks().await;
                Ok(json!({ "tasks": to_result(&tasks)? }))
            }
        }
    }

    async fn send_task_message(&self, params: SendTaskMessageParams) -> A2aResult<Value> {
        let message = TaskMessage::new(params.role, params.content)
            .with_metadata(params.metadata.unwrap_or_default());
        let handler = Arc::clone(&self.handler);

        let processed = self
            .store
            .process_message(&params.task_id, message, move |history| async move {
                handler.handle_message(&history).await
            })
            .await
            .inspect_err(|err| {
                if let A2aError::HandlerFailure { task_id, message } = err {
                    warn!(task_id = %task_id, error = %message, "Handler failed");
                }
            })?;

        to_result(processed.task())
    }

    /// Decode raw bytes and dispatch them.
    ///
    /// Anything that is not a well-formed request envelope yields a
    /// `MALFORMED_ENVELOPE` error response with a null id.
    pub async fn respond(&self, bytes: &[u8]) -> RpcResponse {
        match envelope::decode(bytes) {
            Ok(Envelope::Request(request)) => self.dispatch(request).await,
            Ok(Envelope::Response(_)) => RpcResponse::failure(
                RequestId::Null,
                A2aError::malformed("expected a request envelope, got a response").into(),
            ),
            Err(err) => {
                debug!(error = %err, "Rejecting malformed envelope");
                RpcResponse::failure(RequestId::Null, err.into())
            }
        }
    }

    /// Decode, dispatch and encode in one step
    pub async fn handle_bytes(&self, bytes: &[u8]) -> Vec<u8> {
        let response = self.respond(bytes).await;
        encode_response(response)
    }
}

/// Encode a response, falling back to a fixed error body if encoding fails
pub fn encode_response(response: RpcResponse) -> Vec<u8> {
    envelope::encode(&Envelope::Response(response)).unwrap_or_else(|err| {
        warn!(error = %err, "Failed to encode response");
        ENCODE_FAILURE_BODY.to_vec()
    })
}

/// True when `response` reports an envelope the dispatcher could not decode
pub fn is_malformed(response: &RpcResponse) -> bool {
    response
        .error()
        .is_some_and(|e| e.code == ErrorCode::MalformedEnvelope.as_i32())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Skill, TaskStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Upper {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AgentHandler for Upper {
        fn agent_card(&self) -> AgentCard {
            AgentCard::new("UpperAgent", "Shouts", "http://localhost:5999")
                .with_skill(Skill::new("shout", "Uppercases text"))
        }

        async fn handle_message(&self, history: &[TaskMessage]) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let last = history.last().ok_or("empty history")?;
            if last.content == "fail" {
                return Err("refusing to shout".to_string());
            }
            Ok(last.content.to_uppercase())
        }
    }

    fn dispatcher() -> Dispatcher<Upper> {
        Dispatcher::new(
            Upper {
                calls: AtomicUsize::new(0),
            },
            Arc::new(TaskStore::new()),
        )
    }

    async fn call(d: &Dispatcher<Upper>, method: &str, params: Option<Value>) -> RpcResponse {
        d.dispatch(RpcRequest::new(method, params, 1)).await
    }

    #[tokio::test]
    async fn test_get_agent_card() {
        let d = dispatcher();
        let response = call(&d, "getAgentCard", None).await;
        assert_eq!(response.result().unwrap()["name"], "UpperAgent");
    }

    #[tokio::test]
    async fn test_unknown_method_has_no_side_effect() {
        let d = dispatcher();
        let response = call(&d, "deleteEverything", Some(json!({"task_id": "x"}))).await;
        assert_eq!(response.error().unwrap().code, 1001);
        assert!(d.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_required_param() {
        let d = dispatcher();
        call(&d, "createTask", Some(json!({"task_id": "t"}))).await;

        let response = call(&d, "sendTaskMessage", Some(json!({"task_id": "t"}))).await;
        assert_eq!(response.error().unwrap().code, 1002);

        let task = d.store().get_task("t").await.unwrap();
        assert!(task.messages.is_empty());
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(d.handler().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mistyped_and_non_object_params() {
        let d = dispatcher();
        let response = call(&d, "getTask", Some(json!({"task_id": 7}))).await;
        assert_eq!(response.error().unwrap().code, 1002);

        let response = call(&d, "getTask", Some(json!(["t"]))).await;
        assert_eq!(response.error().unwrap().code, 1002);
    }

    #[tokio::test]
    async fn test_null_params_accepted_for_optional_methods() {
        let d = dispatcher();
        let response = call(&d, "createTask", Some(Value::Null)).await;
        assert_eq!(response.result().unwrap()["status"], "pending");
    }

    #[tokio::test]
    async fn test_send_task_message_returns_full_task() {
        let d = dispatcher();
        call(&d, "createTask", Some(json!({"task_id": "t"}))).await;
        let response = call(
            &d,
            "sendTaskMessage",
            Some(json!({"task_id": "t", "content": "hi", "metadata": {"lang": "en"}})),
        )
        .await;

        let result = response.result().unwrap();
        assert_eq!(result["status"], "completed");
        assert_eq!(result["messages"][0]["role"], "user");
        assert_eq!(result["messages"][0]["metadata"]["lang"], "en");
        assert_eq!(result["messages"][1]["content"], "HI");
    }

    #[tokio::test]
    async fn test_send_to_unknown_task_is_not_created() {
        let d = dispatcher();
        let response = call(
            &d,
            "sendTaskMessage",
            Some(json!({"task_id": "ghost", "content": "hi"})),
        )
        .await;
        assert_eq!(response.error().unwrap().code, 2000);
        assert!(d.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_handler_failure_maps_to_error_envelope() {
        let d = dispatcher();
        call(&d, "createTask", Some(json!({"task_id": "t"}))).await;
        let response = call(
            &d,
            "sendTaskMessage",
            Some(json!({"task_id": "t", "content": "fail"})),
        )
        .await;

        let error = response.error().unwrap();
        assert_eq!(error.code, 3000);
        assert_eq!(error.data, Some(json!({"task_id": "t"})));

        let task = d.store().get_task("t").await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(
            task.messages
                .last()
                .unwrap()
                .content
                .contains("refusing to shout")
        );
    }

    #[tokio::test]
    async fn test_list_tasks_wraps_summaries() {
        let d = dispatcher();
        call(&d, "createTask", Some(json!({"task_id": "a"}))).await;
        call(&d, "createTask", Some(json!({"task_id": "b"}))).await;

        let response = call(&d, "listTasks", None).await;
        let tasks = response.result().unwrap()["tasks"].as_array().unwrap().clone();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0]["task_id"], "a");
        assert_eq!(tasks[0]["message_count"], 0);
    }

    #[tokio::test]
    async fn test_handle_bytes_malformed() {
        let d = dispatcher();
        let bytes = d.handle_bytes(b"{\"method\": \"listTasks\"}").await;
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"]["code"], 1000);
        assert_eq!(value["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_handle_bytes_rejects_response_envelope() {
        let d = dispatcher();
        let response = d.respond(br#"{"jsonrpc":"2.0","result":1,"id":4}"#).await;
        assert!(is_malformed(&response));
    }

    #[tokio::test]
    async fn test_handle_bytes_echoes_id() {
        let d = dispatcher();
        let bytes = d
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"getTask","params":{"task_id":"nope"},"id":"abc"}"#)
            .await;
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["error"]["code"], 2000);
        assert!(value.get("result").is_none());
    }
}
