use crate::execution::SessionRegistry;
use crate::gateway::protocol::RpcError;
use crate::orchestrator::Orchestrator;
use serde_json::{json, Value};

pub fn handle_session_transcript(
    session_id: &str,
    sessions: &SessionRegistry,
) -> Result<Value, RpcError> {
    let session = sessions.try_acquire(session_id)?;
    serde_json::to_value(session.transcript())
        .map_err(|e| RpcError::internal_error(format!("Failed to serialize transcript: {}", e)))
}

/// Replace the connection's session with a fresh one. Returns the new id.
pub fn handle_session_reset(
    session_id: &str,
    orchestrator: &Orchestrator,
    sessions: &SessionRegistry,
) -> Result<(String, Value), RpcError> {
    if sessions.is_busy(session_id) {
        return Err(crate::execution::SessionError::Busy(session_id.to_string()).into());
    }
    sessions.remove(session_id);
    let new_id = sessions.insert(orchestrator.new_session());
    log::info!("[SESSION] Reset {} -> {}", session_id, new_id);
    Ok((
        new_id.clone(),
        json!({
            "previous_session_id": session_id,
            "session_id": new_id,
        }),
    ))
}
