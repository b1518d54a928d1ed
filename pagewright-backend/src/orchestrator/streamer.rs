use crate::ai::{AiClient, AiError, Message, StreamAccumulator, StreamEvent};
use crate::config::GenerationConfig;
use crate::gateway::events::EventSink;
use crate::gateway::protocol::GatewayEvent;
use crate::orchestrator::TurnError;
use uuid::Uuid;

/// Runs one model call, forwarding each token to the caller as it arrives
/// and returning the assembled text.
pub struct ResponseStreamer<'a> {
    client: &'a AiClient,
    generation: &'a GenerationConfig,
    sink: &'a EventSink,
}

impl<'a> ResponseStreamer<'a> {
    pub fn new(client: &'a AiClient, generation: &'a GenerationConfig, sink: &'a EventSink) -> Self {
        Self {
            client,
            generation,
            sink,
        }
    }

    /// Stream a response attributed to `author`.
    ///
    /// A call that cannot start, an in-band stream error, or a closed sink
    /// all end the call with `Err`; no finalized event is sent in those cases.
    pub async fn stream(&self, messages: &[Message], author: &str) -> Result<String, TurnError> {
        let mut rx = self.client.stream_chat(messages, self.generation).await?;

        let session_id = self.sink.session_id();
        let message_id = Uuid::new_v4().to_string();
        self.sink
            .emit(GatewayEvent::message_started(session_id, &message_id, author))
            .await?;

        let mut acc = StreamAccumulator::new();
        while let Some(event) = rx.recv().await {
            if let StreamEvent::ContentDelta { content } = &event {
                self.sink
                    .emit(GatewayEvent::message_token(session_id, &message_id, content))
                    .await?;
            }
            acc.process_event(event);
            if acc.is_complete() {
                break;
            }
        }
        acc.finish();

        if let Some(error) = acc.error {
            log::error!(
                "[STREAM] {} stream failed after {} token(s): {}",
                author,
                acc.deltas,
                error
            );
            return Err(TurnError::Model(AiError::new(format!(
                "Stream failed: {}",
                error
            ))));
        }

        self.sink
            .emit(GatewayEvent::message_finalized(session_id, &message_id, &acc.content))
            .await?;

        log::info!(
            "[STREAM] {} response complete via {}: {} token(s), {} chars, stop_reason={:?}",
            author,
            self.client.provider_name(),
            acc.deltas,
            acc.content.len(),
            acc.stop_reason
        );

        Ok(acc.content)
    }
}
