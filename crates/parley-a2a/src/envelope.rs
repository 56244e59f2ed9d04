//! JSON-RPC 2.0 Envelope Codec
//!
//! Every call between agents travels as one envelope: a request carrying a
//! method name, or a response carrying exactly one of a result or an error.
//! The codec works on `serde_json::Value` trees rather than derived structs so
//! that member *presence* is observable: `"result": null` is a successful
//! result, while a missing `result` is not.
//!
//! ```rust
//! use parley_a2a::envelope::{self, Envelope, RequestId, RpcRequest};
//!
//! let request = RpcRequest::new("getTask", Some(serde_json::json!({"task_id": "t-1"})), 7);
//! let bytes = envelope::encode(&Envelope::Request(request.clone())).unwrap();
//! assert_eq!(envelope::decode(&bytes).unwrap(), Envelope::Request(request));
//! ```

use crate::error::{A2aError, A2aResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version tag carried in every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Caller-chosen request identifier, echoed back in the response.
///
/// Lives in its own namespace: it correlates one request with one response and
/// has nothing to do with task ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

impl RequestId {
    fn to_value(&self) -> Value {
        match self {
            RequestId::Number(n) => Value::from(*n),
            RequestId::String(s) => Value::String(s.clone()),
            RequestId::Null => Value::Null,
        }
    }

    fn from_value(value: &Value) -> A2aResult<Self> {
        match value {
            Value::Null => Ok(RequestId::Null),
            Value::String(s) => Ok(RequestId::String(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(RequestId::Number)
                .ok_or_else(|| A2aError::malformed("id must be an integer, string or null")),
            _ => Err(A2aError::malformed("id must be an integer, string or null")),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl From<u32> for RequestId {
    fn from(id: u32) -> Self {
        RequestId::Number(i64::from(id))
    }
}

impl From<i32> for RequestId {
    fn from(id: i32) -> Self {
        RequestId::Number(i64::from(id))
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Null => write!(f, "null"),
        }
    }
}

/// An RPC request
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    pub params: Option<Value>,
    pub id: RequestId,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: impl Into<RequestId>) -> Self {
        Self {
            method: method.into(),
            params,
            id: id.into(),
        }
    }
}

/// Error object carried by a failed response
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("code".into(), Value::from(self.code));
        map.insert("message".into(), Value::String(self.message.clone()));
        if let Some(data) = &self.data {
            map.insert("data".into(), data.clone());
        }
        Value::Object(map)
    }

    fn from_value(value: &Value) -> A2aResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| A2aError::malformed("error member must be an object"))?;
        let code = map
            .get("code")
            .and_then(Value::as_i64)
            .and_then(|c| i32::try_from(c).ok())
            .ok_or_else(|| A2aError::malformed("error object requires an integer code"))?;
        let message = map
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| A2aError::malformed("error object requires a string message"))?;
        Ok(Self {
            code,
            message: message.to_string(),
            data: map.get("data").cloned(),
        })
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Outcome of a call: a result or an error, never both, never neither
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    Success(Value),
    Failure(RpcError),
}

/// An RPC response
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub id: RequestId,
    pub outcome: RpcOutcome,
}

impl RpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            outcome: RpcOutcome::Success(result),
        }
    }

    pub fn failure(id: RequestId, error: RpcError) -> Self {
        Self {
            id,
            outcome: RpcOutcome::Failure(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, RpcOutcome::Failure(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            RpcOutcome::Success(value) => Some(value),
            RpcOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RpcError> {
        match &self.outcome {
            RpcOutcome::Success(_) => None,
            RpcOutcome::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.outcome {
            RpcOutcome::Success(value) => Ok(value),
            RpcOutcome::Failure(err) => Err(err),
        }
    }
}

/// Any envelope that can appear on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Request(RpcRequest),
    Response(RpcResponse),
}

impl Envelope {
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("jsonrpc".into(), Value::String(JSONRPC_VERSION.into()));
        match self {
            Envelope::Request(request) => {
                map.insert("method".into(), Value::String(request.method.clone()));
                if let Some(params) = &request.params {
                    map.insert("params".into(), params.clone());
                }
                map.insert("id".into(), request.id.to_value());
            }
            Envelope::Response(response) => {
                match &response.outcome {
                    RpcOutcome::Success(result) => {
                        map.insert("result".into(), result.clone());
                    }
                    RpcOutcome::Failure(error) => {
                        map.insert("error".into(), error.to_value());
                    }
                }
                map.insert("id".into(), response.id.to_value());
            }
        }
        Value::Object(map)
    }

    pub fn from_value(value: &Value) -> A2aResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| A2aError::malformed("envelope must be a JSON object"))?;

        match map.get("jsonrpc") {
            Some(Value::String(v)) if v == JSONRPC_VERSION => {}
            Some(other) => {
                return Err(A2aError::malformed(format!(
                    "unsupported protocol version {other}"
                )));
            }
            None => return Err(A2aError::malformed("missing protocol version tag")),
        }

        let has_result = map.contains_key("result");
        let has_error = map.contains_key("error");

        if map.contains_key("method") || !(has_result || has_error) {
            let method = match map.get("method") {
                Some(Value::String(m)) if !m.is_empty() => m.clone(),
                Some(_) => return Err(A2aError::malformed("method must be a non-empty string")),
                None => return Err(A2aError::malformed("missing method name")),
            };
            let id = match map.get("id") {
                Some(id) => RequestId::from_value(id)?,
                None => RequestId::Null,
            };
            return Ok(Envelope::Request(RpcRequest {
                method,
                params: map.get("params").cloned(),
                id,
            }));
        }

        if has_result && has_error {
            return Err(A2aError::malformed(
                "response carries both result and error",
            ));
        }
        let id = map
            .get("id")
            .ok_or_else(|| A2aError::malformed("response is missing its id"))
            .and_then(RequestId::from_value)?;
        let outcome = match map.get("error") {
            Some(error) => RpcOutcome::Failure(RpcError::from_value(error)?),
            None => RpcOutcome::Success(map.get("result").cloned().unwrap_or(Value::Null)),
        };
        Ok(Envelope::Response(RpcResponse { id, outcome }))
    }
}

impl From<RpcRequest> for Envelope {
    fn from(request: RpcRequest) -> Self {
        Envelope::Request(request)
    }
}

impl From<RpcResponse> for Envelope {
    fn from(response: RpcResponse) -> Self {
        Envelope::Response(response)
    }
}

/// Serialize an envelope to bytes
pub fn encode(envelope: &Envelope) -> A2aResult<Vec<u8>> {
    serde_json::to_vec(&envelope.to_value())
        .map_err(|e| A2aError::internal(format!("Failed to encode envelope: {e}")))
}

/// Parse bytes into an envelope, rejecting anything malformed
pub fn decode(bytes: &[u8]) -> A2aResult<Envelope> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| A2aError::malformed(format!("invalid JSON: {e}")))?;
    Envelope::from_value(&value)
}
