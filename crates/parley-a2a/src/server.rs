//! HTTP Binding
//!
//! Exposes one [`Dispatcher`] over HTTP:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /` | JSON-RPC endpoint |
//! | `GET /health` | liveness probe |
//! | `GET /.well-known/agent.json` | agent card discovery |
//!
//! Every well-formed request is answered with `200 OK`, including error
//! envelopes. Bodies that are not a request envelope get `400 Bad Request`
//! together with a `MALFORMED_ENVELOPE` error envelope.
//!
//! # Example
//!
//! ```rust,ignore
//! use parley_a2a::server::AgentServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = AgentServer::new(MyAgent);
//!     server.serve("0.0.0.0:5001").await.unwrap();
//! }
//! ```

use crate::dispatcher::{AgentHandler, Dispatcher, encode_response, is_malformed};
use crate::error::{A2aError, A2aResult};
use crate::store::TaskStore;
use crate::types::AgentCard;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

/// HTTP server for one agent
pub struct AgentServer<H: AgentHandler> {
    dispatcher: Dispatcher<H>,
}

impl<H: AgentHandler> AgentServer<H> {
    /// Create a server with its own empty task store
    pub fn new(handler: H) -> Self {
        Self::from_dispatcher(Dispatcher::new(handler, Arc::new(TaskStore::new())))
    }

    pub fn from_dispatcher(dispatcher: Dispatcher<H>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher<H> {
        &self.dispatcher
    }

    /// Build the Axum router for this server
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", post(handle_rpc::<H>))
            .route("/health", get(health::<H>))
            .route("/.well-known/agent.json", get(agent_card::<H>))
            .with_state(self.dispatcher.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind `addr` and serve until the process ends
    pub async fn serve(self, addr: &str) -> A2aResult<()> {
        self.serve_with_shutdown(addr, std::future::pending::<()>()).await
    }

    /// Bind `addr` and serve until `shutdown` resolves
    pub async fn serve_with_shutdown<F>(self, addr: &str, shutdown: F) -> A2aResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| A2aError::internal(format!("Failed to bind to {addr}: {e}")))?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> A2aResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let card = self.dispatcher.agent_card();
        let local = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        info!(
            name = %card.name,
            url = %card.url,
            skills = ?card.skill_names().collect::<Vec<_>>(),
            address = %local,
            "Agent server starting"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| A2aError::internal(format!("Server error: {e}")))?;

        info!(name = %card.name, "Agent server stopped");
        Ok(())
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST / - JSON-RPC endpoint
async fn handle_rpc<H: AgentHandler>(
    State(dispatcher): State<Dispatcher<H>>,
    body: Bytes,
) -> Response {
    let response = dispatcher.respond(&body).await;
    let status = if is_malformed(&response) {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };

    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        encode_response(response),
    )
        .into_response()
}

/// GET /health - Liveness probe
async fn health<H: AgentHandler>(State(dispatcher): State<Dispatcher<H>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "agent": dispatcher.agent_card().name,
    }))
}

/// GET /.well-known/agent.json - Agent card discovery
async fn agent_card<H: AgentHandler>(State(dispatcher): State<Dispatcher<H>>) -> Json<AgentCard> {
    let card = dispatcher.agent_card();
    debug!(name = %card.name, "Serving agent card");
    Json(card.as_ref().clone())
}
