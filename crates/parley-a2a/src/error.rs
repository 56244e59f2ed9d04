//! Protocol Error Types
//!
//! Every failure the runtime can report is an [`A2aError`]. Protocol, domain
//! and execution errors map onto a fixed wire [`ErrorCode`]; transport errors
//! only ever exist on the calling side and never travel inside an envelope.

use crate::envelope::RpcError;
use crate::types::TaskStatus;
use thiserror::Error;

/// Result type for protocol operations
pub type A2aResult<T> = Result<T, A2aError>;

/// Wire error codes.
///
/// The values sit outside the range JSON-RPC reserves for itself
/// (-32768..=-32000) so they can never be confused with transport-library
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MalformedEnvelope,
    MethodNotFound,
    InvalidParams,
    TaskNotFound,
    TaskExists,
    HandlerFailure,
}

/// Broad class of an error, used by callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Caller sent something the protocol cannot accept
    Protocol,
    /// Caller referenced a valid-looking but wrong identifier
    Domain,
    /// The agent's domain handler failed
    Execution,
    /// The network round-trip itself failed
    Transport,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 6] = [
        ErrorCode::MalformedEnvelope,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidParams,
        ErrorCode::TaskNotFound,
        ErrorCode::TaskExists,
        ErrorCode::HandlerFailure,
    ];

    /// Integer carried in the `code` member of an error object
    pub fn as_i32(self) -> i32 {
        match self {
            ErrorCode::MalformedEnvelope => 1000,
            ErrorCode::MethodNotFound => 1001,
            ErrorCode::InvalidParams => 1002,
            ErrorCode::TaskNotFound => 2000,
            ErrorCode::TaskExists => 2001,
            ErrorCode::HandlerFailure => 3000,
        }
    }

    /// Look up a code received from the wire
    pub fn from_i32(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_i32() == code)
    }

    pub fn class(self) -> ErrorClass {
        match self {
            ErrorCode::MalformedEnvelope | ErrorCode::MethodNotFound | ErrorCode::InvalidParams => {
                ErrorClass::Protocol
            }
            ErrorCode::TaskNotFound | ErrorCode::TaskExists => ErrorClass::Domain,
            ErrorCode::HandlerFailure => ErrorClass::Execution,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::MalformedEnvelope => "MALFORMED_ENVELOPE",
            ErrorCode::MethodNotFound => "METHOD_NOT_FOUND",
            ErrorCode::InvalidParams => "INVALID_PARAMS",
            ErrorCode::TaskNotFound => "TASK_NOT_FOUND",
            ErrorCode::TaskExists => "TASK_EXISTS",
            ErrorCode::HandlerFailure => "HANDLER_FAILURE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors that can occur in protocol operations
#[derive(Debug, Error)]
pub enum A2aError {
    /// Envelope could not be decoded or is missing required members
    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    /// Method name is not one the dispatcher serves
    #[error("Method '{method}' not found")]
    MethodNotFound { method: String },

    /// Required parameter missing or of the wrong shape
    #[error("Invalid params: {reason}")]
    InvalidParams { reason: String },

    /// Task not found
    #[error("Task '{task_id}' not found")]
    TaskNotFound { task_id: String },

    /// Task already exists
    #[error("Task '{task_id}' already exists")]
    TaskExists { task_id: String },

    /// The peer accepted a message but recorded no new turn for it
    #[error("Task '{task_id}' is {status} and did not process the message")]
    MessageNotProcessed { task_id: String, status: TaskStatus },

    /// The agent's domain handler failed while processing a task
    #[error("Error processing task {task_id}: {message}")]
    HandlerFailure { task_id: String, message: String },

    /// Agent card validation failed
    #[error("Invalid agent card: {reason}")]
    InvalidAgentCard { reason: String },

    /// The peer returned an error envelope
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Remote(RpcError),

    /// Connection error
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Request timeout
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Peer answered with a non-success HTTP status and no error envelope
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Peer answered with something that is not a usable response envelope
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl A2aError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            reason: reason.into(),
        }
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    /// Create a task not found error
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    pub fn task_exists(task_id: impl Into<String>) -> Self {
        Self::TaskExists {
            task_id: task_id.into(),
        }
    }

    pub fn message_not_processed(task_id: impl Into<String>, status: TaskStatus) -> Self {
        Self::MessageNotProcessed {
            task_id: task_id.into(),
            status,
        }
    }

    pub fn handler_failure(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerFailure {
            task_id: task_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid agent card error
    pub fn invalid_agent_card(reason: impl Into<String>) -> Self {
        Self::InvalidAgentCard {
            reason: reason.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn malformed_response(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wire code for this error, if it has one.
    ///
    /// Transport failures have no code; a remote error keeps the code the peer
    /// sent when it is one we know.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            A2aError::MalformedEnvelope { .. } => Some(ErrorCode::MalformedEnvelope),
            A2aError::MethodNotFound { .. } => Some(ErrorCode::MethodNotFound),
            A2aError::InvalidParams { .. } | A2aError::InvalidAgentCard { .. } => {
                Some(ErrorCode::InvalidParams)
            }
            A2aError::TaskNotFound { .. } => Some(ErrorCode::TaskNotFound),
            A2aError::TaskExists { .. } => Some(ErrorCode::TaskExists),
            A2aError::HandlerFailure { .. } | A2aError::Internal { .. } => {
                Some(ErrorCode::HandlerFailure)
            }
            A2aError::Remote(err) => ErrorCode::from_i32(err.code),
            A2aError::MessageNotProcessed { .. }
            | A2aError::Connection { .. }
            | A2aError::Timeout { .. }
            | A2aError::HttpStatus { .. }
            | A2aError::MalformedResponse { .. }
            | A2aError::Url(_) => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        if self.is_transport() {
            return ErrorClass::Transport;
        }
        if let A2aError::MessageNotProcessed { .. } = self {
            return ErrorClass::Domain;
        }
        self.code()
            .map(ErrorCode::class)
            .unwrap_or(ErrorClass::Execution)
    }

    /// True when the call never produced a decodable protocol answer
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            A2aError::Connection { .. }
                | A2aError::Timeout { .. }
                | A2aError::HttpStatus { .. }
                | A2aError::MalformedResponse { .. }
                | A2aError::Url(_)
        )
    }
}

impl From<A2aError> for RpcError {
    fn from(err: A2aError) -> Self {
        match err {
            A2aError::Remote(remote) => remote,
            A2aError::HandlerFailure { ref task_id, .. } => {
                let data = serde_json::json!({ "task_id": task_id });
                RpcError::new(ErrorCode::HandlerFailure.as_i32(), err.to_string()).with_data(data)
            }
            other => {
                let code = other.code().unwrap_or(ErrorCode::HandlerFailure);
                RpcError::new(code.as_i32(), other.to_string())
            }
        }
    }
}

impl From<RpcError> for A2aError {
    fn from(err: RpcError) -> Self {
        A2aError::Remote(err)
    }
}
