use crate::execution::SessionRegistry;
use crate::gateway::events::EventSink;
use crate::gateway::protocol::RpcError;
use crate::models::UserTurn;
use crate::orchestrator::{Orchestrator, TurnError};
use serde_json::{json, Value};
use std::sync::Arc;

use super::MODEL_ERROR;

/// Run one user turn on the connection's session.
///
/// Replies once the turn is complete; the streamed output reaches the client
/// through `sink` while this runs. A second `chat.send` for the same session
/// is refused while a turn is in progress.
pub async fn handle_chat_send(
    params: Value,
    orchestrator: Arc<Orchestrator>,
    sessions: Arc<SessionRegistry>,
    sink: EventSink,
) -> Result<Value, RpcError> {
    let turn: UserTurn = serde_json::from_value(params)
        .map_err(|e| RpcError::invalid_params(format!("Invalid params: {}", e)))?;

    let mut session = sessions.try_acquire(sink.session_id())?;
    let outcome = orchestrator
        .handle_turn(&mut session, turn, &sink)
        .await
        .map_err(turn_error_to_rpc)?;

    Ok(json!({
        "session_id": session.id,
        "final_state": outcome.final_state,
        "agent": outcome.agent,
        "content": outcome.content,
    }))
}

fn turn_error_to_rpc(e: TurnError) -> RpcError {
    match e {
        TurnError::Attachment(msg) => RpcError::invalid_params(msg),
        TurnError::Model(err) => {
            let message = if err.is_client_error() {
                format!("Model rejected the request: {}", err)
            } else if err.is_server_error() {
                format!("Model service unavailable, try again: {}", err)
            } else {
                err.to_string()
            };
            RpcError::new(MODEL_ERROR, message)
        }
        other => RpcError::internal_error(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentRoster;
    use crate::ai::{AiClient, AiError, MockAiClient, MockReply};
    use crate::artifacts::ArtifactStore;
    use crate::config::GenerationConfig;
    use crate::gateway::methods::{SESSION_BUSY, SESSION_NOT_FOUND};
    use crate::orchestrator::dispatch::Dispatcher;

    fn orchestrator(replies: Vec<MockReply>, dir: &std::path::Path) -> Arc<Orchestrator> {
        let client = Arc::new(AiClient::Mock(MockAiClient::new(replies)));
        Arc::new(Orchestrator::new(
            client.clone(),
            GenerationConfig::default(),
            Dispatcher::new(AgentRoster::new(client)),
            Arc::new(ArtifactStore::new(dir)),
        ))
    }

    #[tokio::test]
    async fn test_chat_send_returns_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(vec![MockReply::text("Hello there.")], dir.path());
        let sessions = Arc::new(SessionRegistry::new());
        let id = sessions.insert(orchestrator.new_session());
        let (sink, _rx) = EventSink::channel(id.clone());

        let result = handle_chat_send(json!({"text": "hi"}), orchestrator, sessions.clone(), sink)
            .await
            .unwrap();
        assert_eq!(result["final_state"], "no_op");
        assert_eq!(result["agent"], Value::Null);
        assert_eq!(result["content"], "Hello there.");
        assert_eq!(sessions.acquire(&id).await.unwrap().store.len(), 3);
    }

    #[tokio::test]
    async fn test_chat_send_rejects_bad_params() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(vec![], dir.path());
        let sessions = Arc::new(SessionRegistry::new());
        let id = sessions.insert(orchestrator.new_session());
        let (sink, _rx) = EventSink::channel(id);

        let err = handle_chat_send(json!({"message": "hi"}), orchestrator, sessions, sink)
            .await
            .unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_chat_send_refused_while_turn_running() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(vec![MockReply::text("unused")], dir.path());
        let sessions = Arc::new(SessionRegistry::new());
        let id = sessions.insert(orchestrator.new_session());
        let (sink, _rx) = EventSink::channel(id.clone());

        let _running = sessions.try_acquire(&id).unwrap();
        let err = handle_chat_send(json!({"text": "hi"}), orchestrator, sessions.clone(), sink)
            .await
            .unwrap_err();
        assert_eq!(err.code, SESSION_BUSY);
    }

    #[tokio::test]
    async fn test_chat_send_unknown_session() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(vec![], dir.path());
        let sessions = Arc::new(SessionRegistry::new());
        let (sink, _rx) = EventSink::channel("gone");

        let err = handle_chat_send(json!({"text": "hi"}), orchestrator, sessions, sink)
            .await
            .unwrap_err();
        assert_eq!(err.code, SESSION_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_model_failure_maps_to_model_error() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator(
            vec![MockReply::FailToStart(AiError::with_status("rate limited", 429))],
            dir.path(),
        );
        let sessions = Arc::new(SessionRegistry::new());
        let id = sessions.insert(orchestrator.new_session());
        let (sink, _rx) = EventSink::channel(id);

        let err = handle_chat_send(json!({"text": "hi"}), orchestrator, sessions, sink)
            .await
            .unwrap_err();
        assert_eq!(err.code, MODEL_ERROR);
        assert!(err.message.contains("rate limited"));
    }

    #[test]
    fn test_model_errors_say_who_failed() {
        let rejected = turn_error_to_rpc(TurnError::Model(AiError::with_status("bad key", 401)));
        assert_eq!(rejected.code, MODEL_ERROR);
        assert!(rejected.message.starts_with("Model rejected the request"));

        let down = turn_error_to_rpc(TurnError::Model(AiError::with_status("overloaded", 503)));
        assert!(down.message.starts_with("Model service unavailable"));

        let network = turn_error_to_rpc(TurnError::Model(AiError::new("connection reset")));
        assert_eq!(network.message, "connection reset");
    }
}
