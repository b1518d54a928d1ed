//! Wire types for the WebSocket gateway: JSON-RPC style requests/responses
//! from the client, and `{event, data}` frames pushed while a turn runs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: String, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: String, error: RpcError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: String) -> Self {
        Self { code, message }
    }

    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error".to_string())
    }

    pub fn method_not_found() -> Self {
        Self::new(-32601, "Method not found".to_string())
    }

    pub fn invalid_params(message: String) -> Self {
        Self::new(-32602, message)
    }

    pub fn internal_error(message: String) -> Self {
        Self::new(-32603, message)
    }
}

/// Event pushed to the client outside the request/response flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    pub data: Value,
}

impl GatewayEvent {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }

    /// The connection is bound to a (new) session
    pub fn session_started(session_id: &str) -> Self {
        Self::new("session.started", json!({ "session_id": session_id }))
    }

    /// A new assistant message has started; tokens for `message_id` follow
    pub fn message_started(session_id: &str, message_id: &str, author: &str) -> Self {
        Self::new(
            "message.started",
            json!({
                "session_id": session_id,
                "message_id": message_id,
                "author": author,
            }),
        )
    }

    pub fn message_token(session_id: &str, message_id: &str, token: &str) -> Self {
        Self::new(
            "message.token",
            json!({
                "session_id": session_id,
                "message_id": message_id,
                "token": token,
            }),
        )
    }

    pub fn message_finalized(session_id: &str, message_id: &str, content: &str) -> Self {
        Self::new(
            "message.finalized",
            json!({
                "session_id": session_id,
                "message_id": message_id,
                "content": content,
            }),
        )
    }

    /// `fallback` is set when the requested keyword matched no agent
    pub fn agent_handoff(session_id: &str, agent: &str, keyword: &str, fallback: bool) -> Self {
        Self::new(
            "agent.handoff",
            json!({
                "session_id": session_id,
                "agent": agent,
                "keyword": keyword,
                "fallback": fallback,
            }),
        )
    }

    pub fn artifact_updated(session_id: &str, file: &str) -> Self {
        Self::new(
            "artifact.updated",
            json!({
                "session_id": session_id,
                "file": file,
            }),
        )
    }

    /// Token payload, if this is a `message.token` event
    pub fn token(&self) -> Option<&str> {
        if self.event != "message.token" {
            return None;
        }
        self.data.get("token").and_then(|t| t.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: RpcRequest = serde_json::from_str(r#"{"method":"ping"}"#).unwrap();
        assert_eq!(request.id, "");
        assert_eq!(request.params, Value::Null);
    }

    #[test]
    fn test_response_omits_empty_fields() {
        let ok = serde_json::to_value(RpcResponse::success("1".into(), json!("pong"))).unwrap();
        assert_eq!(ok, json!({"id": "1", "result": "pong"}));

        let err =
            serde_json::to_value(RpcResponse::error("2".into(), RpcError::method_not_found()))
                .unwrap();
        assert_eq!(err["error"]["code"], -32601);
        assert!(err.get("result").is_none());
    }

    #[test]
    fn test_token_accessor() {
        let token = GatewayEvent::message_token("s", "m", "Hel");
        assert_eq!(token.token(), Some("Hel"));
        let started = GatewayEvent::message_started("s", "m", "Orchestrator");
        assert_eq!(started.token(), None);
    }
}
