//! # Parley A2A - Agent-to-Agent Protocol Runtime
//!
//! Independent agents advertise what they can do on an Agent Card, accept
//! task-oriented conversations, and talk to each other with synchronous
//! JSON-RPC 2.0 calls. An orchestrating agent keeps a registry of peers and
//! routes free text to the peer skill that matches it best.
//!
//! ## Components
//!
//! - [`envelope`] - JSON-RPC request/response codec
//! - [`registry`] - own card plus the ordered set of known peers
//! - [`store`] - tasks, message history and the lifecycle state machine
//! - [`dispatcher`] - method table and the [`AgentHandler`] hook
//! - `client` - outbound calls to peers (requires `client` feature)
//! - [`router`] - keyword-based peer selection
//! - `server` - axum HTTP binding (requires `server` feature)
//!
//! ## Task lifecycle
//!
//! ```text
//! pending ──► in_progress ──► completed
//!                        └──► failed
//! ```
//!
//! ## Example: driving a task directly
//!
//! ```rust
//! use parley_a2a::{TaskMessage, TaskStatus, TaskStore};
//!
//! # tokio_test::block_on(async {
//! let store = TaskStore::new();
//! let task = store.create_task(None, None).await.unwrap();
//! assert_eq!(task.status, TaskStatus::Pending);
//!
//! let processed = store
//!     .process_message(&task.task_id, TaskMessage::user("ping"), |_| async {
//!         Ok("pong".to_string())
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(processed.task().status, TaskStatus::Completed);
//! # });
//! ```

pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod router;
pub mod store;
pub mod types;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod server;

pub use dispatcher::{AgentHandler, Dispatcher, Method};
pub use envelope::{Envelope, RequestId, RpcError, RpcOutcome, RpcRequest, RpcResponse};
pub use error::{A2aError, A2aResult, ErrorClass, ErrorCode};
pub use registry::{CapabilityRegistry, PeerEntry, Registration};
pub use router::{KeywordTable, OrchestrationRouter, PeerInvoker, RouteOutcome};
pub use store::{Processed, TaskStore};
pub use types::{
    AgentCard, InteractionMode, MessageRole, Metadata, ParameterSpec, Skill, Task, TaskMessage,
    TaskStatus, TaskSummary, Transition,
};

#[cfg(feature = "client")]
pub use client::{AgentClient, ClientConfig, HealthStatus};

#[cfg(feature = "server")]
pub use server::AgentServer;
