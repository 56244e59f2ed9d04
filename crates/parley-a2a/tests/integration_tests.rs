//! Integration tests for client/server interaction
//!
//! These tests run real agents on ephemeral ports and talk to them through
//! `AgentClient`, covering discovery, task management, failures and routing.

#![cfg(all(feature = "client", feature = "server"))]

use async_trait::async_trait;
use parley_a2a::{
    A2aError, AgentCard, AgentClient, AgentHandler, AgentServer, CapabilityRegistry,
    ClientConfig, MessageRole, OrchestrationRouter, PeerInvoker, RouteOutcome, Skill,
    TaskMessage, TaskStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

// =============================================================================
// Test Agent Handlers
// =============================================================================

/// Echoes the last message back
struct EchoAgent;

#[async_trait]
impl AgentHandler for EchoAgent {
    fn agent_card(&self) -> AgentCard {
        AgentCard::new("EchoAgent", "Echoes messages back", "http://localhost")
            .with_skill(Skill::new("echo", "Echoes the input message"))
    }

    async fn handle_message(&self, history: &[TaskMessage]) -> Result<String, String> {
        let last = history.last().ok_or("no messages")?;
        Ok(format!("Echo: {}", last.content))
    }
}

/// Fails every message it receives
struct FailingAgent;

#[async_trait]
impl AgentHandler for FailingAgent {
    fn agent_card(&self) -> AgentCard {
        AgentCard::new("FailingAgent", "Always fails", "http://localhost")
            .with_skill(Skill::new("fail", "Fails"))
    }

    async fn handle_message(&self, _history: &[TaskMessage]) -> Result<String, String> {
        Err("intentional failure".to_string())
    }
}

/// Replies after a delay
struct SlowAgent(Duration);

#[async_trait]
impl AgentHandler for SlowAgent {
    fn agent_card(&self) -> AgentCard {
        AgentCard::new("SlowAgent", "Takes its time", "http://localhost")
    }

    async fn handle_message(&self, _history: &[TaskMessage]) -> Result<String, String> {
        tokio::time::sleep(self.0).await;
        Ok("finally".to_string())
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn spawn_agent<H: AgentHandler>(handler: H) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let server = AgentServer::new(handler);
    tokio::spawn(async move {
        server
            .serve_on(listener, std::future::pending::<()>())
            .await
            .unwrap();
    });
    address
}

fn client() -> AgentClient {
    AgentClient::new(ClientConfig::default()).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_fetch_agent_card() {
    let address = spawn_agent(EchoAgent).await;
    let card = client().fetch_agent_card(&address).await.unwrap();
    assert_eq!(card.name, "EchoAgent");
    assert_eq!(card.skills[0].name, "echo");
}

#[tokio::test]
async fn test_create_task_generates_id() {
    let address = spawn_agent(EchoAgent).await;
    let task = client().create_task(&address, None, None).await.unwrap();
    assert!(!task.task_id.is_empty());
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.messages.is_empty());
}

#[tokio::test]
async fn test_duplicate_task_id() {
    let address = spawn_agent(EchoAgent).await;
    let client = client();
    client
        .create_task(&address, Some("fixed"), None)
        .await
        .unwrap();

    let err = client
        .create_task(&address, Some("fixed"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, A2aError::Remote(ref e) if e.code == 2001));
}

#[tokio::test]
async fn test_chat_round_trip() {
    let address = spawn_agent(EchoAgent).await;
    let client = client();

    let reply = client.chat(&address, "hello there").await.unwrap();
    assert_eq!(reply, "Echo: hello there");

    let tasks = client.list_tasks(&address).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Completed);
    assert_eq!(tasks[0].message_count, 2);
}

#[tokio::test]
async fn test_message_to_completed_task_is_benign() {
    let address = spawn_agent(EchoAgent).await;
    let client = client();
    let task = client.create_task(&address, None, None).await.unwrap();
    client
        .send_task_message(&address, &task.task_id, MessageRole::User, "first")
        .await
        .unwrap();

    let again = client
        .send_task_message(&address, &task.task_id, MessageRole::User, "second")
        .await
        .unwrap();
    assert_eq!(again.status, TaskStatus::Completed);
    assert_eq!(again.messages.len(), 2);
}

#[tokio::test]
async fn test_chat_in_finished_task_returns_no_stale_reply() {
    let address = spawn_agent(EchoAgent).await;
    let client = client();
    let task = client.create_task(&address, None, None).await.unwrap();

    let first = client
        .chat_in_task(&address, &task.task_id, "first")
        .await
        .unwrap();
    assert_eq!(first, "Echo: first");

    for text in ["second", "first"] {
        let err = client
            .chat_in_task(&address, &task.task_id, text)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                A2aError::MessageNotProcessed { ref task_id, status: TaskStatus::Completed }
                    if *task_id == task.task_id
            ),
            "unexpected error: {err}"
        );
    }

    let unchanged = client.get_task(&address, &task.task_id).await.unwrap();
    assert_eq!(unchanged.messages.len(), 2);
}

#[tokio::test]
async fn test_handler_failure_reaches_caller() {
    let address = spawn_agent(FailingAgent).await;
    let client = client();
    let task = client.create_task(&address, None, None).await.unwrap();

    let err = client
        .send_task_message(&address, &task.task_id, MessageRole::User, "do it")
        .await
        .unwrap_err();
    let A2aError::Remote(remote) = err else {
        panic!("expected remote error");
    };
    assert_eq!(remote.code, 3000);
    assert_eq!(
        remote.data,
        Some(serde_json::json!({ "task_id": task.task_id }))
    );

    let failed = client.get_task(&address, &task.task_id).await.unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    let note = failed.messages.last().unwrap();
    assert_eq!(note.role, MessageRole::System);
    assert_eq!(note.content, "Error processing task: intentional failure");
}

#[tokio::test]
async fn test_unknown_task_has_no_result() {
    let address = spawn_agent(EchoAgent).await;
    let err = client()
        .get_task(&address, "nonexistent")
        .await
        .unwrap_err();
    assert!(matches!(err, A2aError::Remote(ref e) if e.code == 2000));
}

#[tokio::test]
async fn test_timeout_leaves_remote_state() {
    let address = spawn_agent(SlowAgent(Duration::from_millis(600))).await;
    let impatient =
        AgentClient::new(ClientConfig::default().with_timeout(Duration::from_millis(100))).unwrap();
    let task = impatient.create_task(&address, None, None).await.unwrap();

    let err = impatient
        .chat_in_task(&address, &task.task_id, "hurry")
        .await
        .unwrap_err();
    assert!(matches!(err, A2aError::Timeout { .. }));

    tokio::time::sleep(Duration::from_millis(800)).await;
    let finished = client().get_task(&address, &task.task_id).await.unwrap();
    assert_eq!(finished.status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_concurrent_tasks_keep_their_own_order() {
    let address = spawn_agent(EchoAgent).await;
    let client = client();

    let mut handles = Vec::new();
    for n in 0..8 {
        let client = client.clone();
        let address = address.clone();
        handles.push(tokio::spawn(async move {
            let task_id = format!("task-{n}");
            client
                .create_task(&address, Some(&task_id), None)
                .await
                .unwrap();
            client
                .chat_in_task(&address, &task_id, &format!("message {n}"))
                .await
                .unwrap();
            task_id
        }));
    }

    for (n, handle) in handles.into_iter().enumerate() {
        let task_id = handle.await.unwrap();
        let task = client.get_task(&address, &task_id).await.unwrap();
        let contents: Vec<_> = task.messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(
            contents,
            vec![format!("message {n}"), format!("Echo: message {n}")]
        );
    }
}

#[tokio::test]
async fn test_router_over_real_peers() {
    let echo = spawn_agent(EchoAgent).await;
    let registry = Arc::new(CapabilityRegistry::new(AgentCard::new(
        "OrchestratorAgent",
        "Routes requests",
        "http://localhost",
    )));
    let invoker: Arc<dyn PeerInvoker> = Arc::new(client());
    let router = OrchestrationRouter::new(registry, invoker);
    router.register_peer(&echo).await.unwrap();

    let outcome = router.route("please echo this").await;
    assert_eq!(
        outcome.reply_text(),
        "EchoAgent: Echo: please echo this"
    );
    assert!(matches!(outcome, RouteOutcome::Routed { .. }));
}

#[tokio::test]
async fn test_health_probe() {
    let address = spawn_agent(EchoAgent).await;
    let health = client().health(&address).await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.agent, "EchoAgent");
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client().chat(&address, "anyone?").await.unwrap_err();
    assert!(err.is_transport());
}
