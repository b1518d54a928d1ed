//! Actix-Web WebSocket handler for the chat gateway.
//!
//! Each connection owns exactly one session at a time: it is created when the
//! socket opens, swapped on `session.reset`, and dropped when the socket closes.
//! Closing the socket also closes the connection's event sink, which abandons
//! any turn still streaming.

use crate::execution::SessionRegistry;
use crate::gateway::events::EventSink;
use crate::gateway::methods;
use crate::gateway::protocol::{GatewayEvent, RpcError, RpcRequest, RpcResponse};
use crate::orchestrator::Orchestrator;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::AggregatedMessage;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Largest accepted message, single frame or aggregated (images arrive inline)
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Keeps the connection's current session attached in the registry so the
/// idle sweep never collects it. Dropping the binding detaches it.
struct SessionBinding {
    sessions: Arc<SessionRegistry>,
    session_id: String,
}

impl SessionBinding {
    fn new(sessions: Arc<SessionRegistry>, session_id: String) -> Self {
        sessions.attach(&session_id);
        Self {
            sessions,
            session_id,
        }
    }

    fn rebind(&mut self, session_id: String) {
        self.sessions.detach(&self.session_id);
        self.sessions.attach(&session_id);
        self.session_id = session_id;
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionBinding {
    fn drop(&mut self) {
        self.sessions.detach(&self.session_id);
    }
}

/// WebSocket handler for Actix-Web
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    orchestrator: web::Data<Arc<Orchestrator>>,
    sessions: web::Data<Arc<SessionRegistry>>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    let orchestrator = orchestrator.get_ref().clone();
    let sessions = sessions.get_ref().clone();

    actix_web::rt::spawn(handle_ws_connection(
        session,
        msg_stream,
        orchestrator,
        sessions,
    ));

    Ok(response)
}

async fn handle_ws_connection(
    mut ws: actix_ws::Session,
    msg_stream: actix_ws::MessageStream,
    orchestrator: Arc<Orchestrator>,
    sessions: Arc<SessionRegistry>,
) {
    let mut msg_stream = msg_stream
        .max_frame_size(MAX_FRAME_SIZE)
        .aggregate_continuations()
        .max_continuation_size(MAX_FRAME_SIZE);

    let session_id = sessions.insert(orchestrator.new_session());
    let mut binding = SessionBinding::new(sessions.clone(), session_id.clone());
    let (mut sink, mut event_rx) = EventSink::channel(session_id);
    log::info!("[WEBSOCKET] New connection bound to session {}", sink.session_id());

    // RPC responses, including those from turns running in the background
    let (tx, mut rx) = mpsc::channel::<String>(100);

    let mut send_session = ws.clone();
    let send_task = tokio::spawn(async move {
        loop {
            // Events first: a turn's reply is queued after its last event
            tokio::select! {
                biased;
                Some(event) = event_rx.recv() => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        if event.event != "message.token" {
                            log::debug!("[WEBSOCKET] >>> event '{}'", event.event);
                        }
                        if send_session.text(json).await.is_err() {
                            log::warn!("[WEBSOCKET] Failed to send event, closing sender");
                            break;
                        }
                    }
                }
                Some(msg) = rx.recv() => {
                    log::debug!("[WEBSOCKET] >>> RPC response:\n{}", msg);
                    if send_session.text(msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    if sink
        .emit(GatewayEvent::session_started(sink.session_id()))
        .await
        .is_err()
    {
        log::warn!("[WEBSOCKET] Client gone before session {} started", sink.session_id());
    }

    while let Some(msg_result) = msg_stream.next().await {
        match msg_result {
            Ok(AggregatedMessage::Text(text)) => {
                log::debug!("[WEBSOCKET] <<< RPC request ({} bytes)", text.len());
                let request: RpcRequest = match serde_json::from_str(&text) {
                    Ok(req) => req,
                    Err(_) => {
                        send_response(&tx, RpcResponse::error(String::new(), RpcError::parse_error()))
                            .await;
                        continue;
                    }
                };

                match request.method.as_str() {
                    // Turns run off the read loop so pings and transcripts stay responsive
                    "chat.send" => {
                        let tx = tx.clone();
                        let orchestrator = orchestrator.clone();
                        let sessions = sessions.clone();
                        let sink = sink.clone();
                        tokio::spawn(async move {
                            let result = methods::handle_chat_send(
                                request.params,
                                orchestrator,
                                sessions,
                                sink,
                            )
                            .await;
                            send_response(&tx, into_response(request.id, result)).await;
                        });
                    }
                    "session.reset" => {
                        let result = methods::handle_session_reset(
                            sink.session_id(),
                            &orchestrator,
                            &sessions,
                        )
                        .map(|(new_id, value)| {
                            binding.rebind(new_id.clone());
                            sink = sink.for_session(new_id);
                            value
                        });
                        if result.is_ok() {
                            let _ = sink
                                .emit(GatewayEvent::session_started(sink.session_id()))
                                .await;
                        }
                        send_response(&tx, into_response(request.id, result)).await;
                    }
                    _ => {
                        let result = dispatch_method(&request, sink.session_id(), &sessions).await;
                        send_response(&tx, into_response(request.id, result)).await;
                    }
                }
            }
            Ok(AggregatedMessage::Ping(data)) => {
                if ws.pong(&data).await.is_err() {
                    break;
                }
            }
            Ok(AggregatedMessage::Close(_)) => {
                break;
            }
            Err(e) => {
                log::error!("[WEBSOCKET] Protocol error: {:?}", e);
                break;
            }
            _ => {}
        }
    }

    // Dropping the event receiver makes any running turn fail with Disconnected
    send_task.abort();
    sessions.remove(binding.session_id());
    let _ = ws.close(None).await;
    log::info!("[WEBSOCKET] Connection for session {} closed", binding.session_id());
}

async fn dispatch_method(
    request: &RpcRequest,
    session_id: &str,
    sessions: &SessionRegistry,
) -> Result<serde_json::Value, RpcError> {
    match request.method.as_str() {
        "ping" => methods::handle_ping().await,
        "session.transcript" => methods::handle_session_transcript(session_id, sessions),
        _ => Err(RpcError::method_not_found()),
    }
}

fn into_response(id: String, result: Result<serde_json::Value, RpcError>) -> RpcResponse {
    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(error) => RpcResponse::error(id, error),
    }
}

async fn send_response(tx: &mpsc::Sender<String>, response: RpcResponse) {
    if let Ok(json) = serde_json::to_string(&response) {
        let _ = tx.send(json).await;
    }
}
