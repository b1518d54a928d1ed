use crate::gateway::protocol::GatewayEvent;
use tokio::sync::mpsc;

/// Per-connection buffer of outgoing events
pub const EVENT_BUFFER_SIZE: usize = 1000;

/// The receiving side of an [`EventSink`] has gone away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

impl std::fmt::Display for SinkClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event receiver closed")
    }
}

impl std::error::Error for SinkClosed {}

/// Delivers events for one session to its transport.
///
/// `emit` waits for buffer space rather than dropping: partial output must
/// reach the client in order and without gaps. Once the transport drops the
/// receiver every emit fails, which is how a turn learns it was abandoned.
#[derive(Debug, Clone)]
pub struct EventSink {
    session_id: String,
    sender: mpsc::Sender<GatewayEvent>,
}

impl EventSink {
    pub fn new(session_id: impl Into<String>, sender: mpsc::Sender<GatewayEvent>) -> Self {
        Self {
            session_id: session_id.into(),
            sender,
        }
    }

    /// Create a sink together with the receiver the transport drains
    pub fn channel(session_id: impl Into<String>) -> (Self, mpsc::Receiver<GatewayEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        (Self::new(session_id, tx), rx)
    }

    /// Same transport, different session (after a reset)
    pub fn for_session(&self, session_id: impl Into<String>) -> Self {
        Self::new(session_id, self.sender.clone())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn emit(&self, event: GatewayEvent) -> Result<(), SinkClosed> {
        if log::log_enabled!(log::Level::Debug) && event.event != "message.token" {
            log::debug!(
                "[EVENTS] '{}' for session {}: {}",
                event.event,
                self.session_id,
                event.data
            );
        }
        self.sender.send(event).await.map_err(|_| SinkClosed)
    }
}
