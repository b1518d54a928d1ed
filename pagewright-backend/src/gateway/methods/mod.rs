pub mod chat;
pub mod session;

pub use chat::*;
pub use session::*;

use crate::execution::SessionError;
use crate::gateway::protocol::RpcError;
use serde_json::Value;

/// Application error codes, outside the JSON-RPC reserved range
pub const SESSION_NOT_FOUND: i32 = -32004;
pub const SESSION_BUSY: i32 = -32009;
pub const MODEL_ERROR: i32 = -32020;

pub async fn handle_ping() -> Result<Value, RpcError> {
    Ok(serde_json::json!("pong"))
}

impl From<SessionError> for RpcError {
    fn from(e: SessionError) -> Self {
        let code = match e {
            SessionError::NotFound(_) => SESSION_NOT_FOUND,
            SessionError::Busy(_) => SESSION_BUSY,
        };
        RpcError::new(code, e.to_string())
    }
}
