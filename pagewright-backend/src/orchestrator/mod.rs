//! The turn loop: store the user's message, stream the orchestrator's reply,
//! then either keep that reply or hand the turn to an agent.

pub mod directive;
pub mod dispatch;
pub mod streamer;

#[cfg(test)]
mod tests;

use crate::agents::{prompts, AgentContext, AgentKind};
use crate::ai::{AiClient, AiError, Message};
use crate::artifacts::ArtifactStore;
use crate::config::GenerationConfig;
use crate::gateway::events::{EventSink, SinkClosed};
use crate::gateway::protocol::GatewayEvent;
use crate::models::{ChatSession, UserTurn};
use directive::parse_directive;
use dispatch::{DispatchOutcome, Dispatcher};
use serde::Serialize;
use std::sync::Arc;
use streamer::ResponseStreamer;

/// Author name on events streamed by the orchestrator itself
pub const ORCHESTRATOR_AUTHOR: &str = "Orchestrator";

#[derive(Debug)]
pub enum TurnError {
    /// The user's attachment could not be read
    Attachment(String),
    /// The model call failed to start or failed mid-stream
    Model(AiError),
    /// An agent could not read or write project files
    Artifact(String),
    /// The client went away before the turn finished
    Disconnected,
}

impl std::fmt::Display for TurnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnError::Attachment(e) => write!(f, "Attachment error: {}", e),
            TurnError::Model(e) => write!(f, "Model error: {}", e),
            TurnError::Artifact(e) => write!(f, "Artifact error: {}", e),
            TurnError::Disconnected => write!(f, "Client disconnected"),
        }
    }
}

impl std::error::Error for TurnError {}

impl From<AiError> for TurnError {
    fn from(e: AiError) -> Self {
        TurnError::Model(e)
    }
}

impl From<SinkClosed> for TurnError {
    fn from(_: SinkClosed) -> Self {
        TurnError::Disconnected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    AwaitingModel,
    DirectiveCheck,
    NoOp,
    AgentHandoff,
}

impl TurnState {
    /// Errors may abort from any non-idle state straight back to Idle.
    pub fn can_transition_to(self, next: TurnState) -> bool {
        use TurnState::*;
        matches!(
            (self, next),
            (Idle, AwaitingModel)
                | (AwaitingModel, DirectiveCheck)
                | (AwaitingModel, Idle)
                | (DirectiveCheck, NoOp)
                | (DirectiveCheck, AgentHandoff)
                | (NoOp, Idle)
                | (AgentHandoff, Idle)
        )
    }
}

/// Tracks one turn's position in the state machine
struct TurnTracker<'a> {
    session_id: &'a str,
    state: TurnState,
}

impl<'a> TurnTracker<'a> {
    fn new(session_id: &'a str) -> Self {
        Self {
            session_id,
            state: TurnState::Idle,
        }
    }

    fn advance(&mut self, next: TurnState) {
        if !self.state.can_transition_to(next) {
            log::error!(
                "[TURN] Session {}: unexpected transition {:?} -> {:?}",
                self.session_id,
                self.state,
                next
            );
        }
        log::debug!("[TURN] Session {}: {:?} -> {:?}", self.session_id, self.state, next);
        self.state = next;
    }
}

/// Result of a completed turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// NoOp or AgentHandoff, the last state before returning to Idle
    pub final_state: TurnState,
    pub agent: Option<AgentKind>,
    /// The assistant message appended for this turn
    pub content: String,
}

pub struct Orchestrator {
    client: Arc<AiClient>,
    generation: GenerationConfig,
    dispatcher: Dispatcher,
    artifacts: Arc<ArtifactStore>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<AiClient>,
        generation: GenerationConfig,
        dispatcher: Dispatcher,
        artifacts: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            client,
            generation,
            dispatcher,
            artifacts,
        }
    }

    /// System prompt for new sessions
    pub fn system_prompt(&self) -> &'static str {
        prompts::ORCHESTRATOR_PROMPT
    }

    pub fn new_session(&self) -> ChatSession {
        ChatSession::new(self.system_prompt())
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Process one user turn to completion.
    ///
    /// On error the user's message may already be in history but no assistant
    /// message is appended, so the session stays usable.
    pub async fn handle_turn(
        &self,
        session: &mut ChatSession,
        turn: UserTurn,
        sink: &EventSink,
    ) -> Result<TurnOutcome, TurnError> {
        let session_id = session.id.clone();
        let mut tracker = TurnTracker::new(&session_id);

        let attachments = turn.attachments.len();
        let message = turn.into_message().await.map_err(|e| {
            log::error!("[TURN] Session {}: {}", session_id, e);
            TurnError::Attachment(e)
        })?;
        log::info!(
            "[TURN] Session {}: user message received ({} attachment(s), image={})",
            session_id,
            attachments,
            message.content.is_multimodal()
        );
        session.store.append(message);

        tracker.advance(TurnState::AwaitingModel);
        let streamer = ResponseStreamer::new(&self.client, &self.generation, sink);
        let text = match streamer.stream(session.store.all(), ORCHESTRATOR_AUTHOR).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("[TURN] Session {}: orchestrator response failed: {}", session_id, e);
                tracker.advance(TurnState::Idle);
                return Err(e);
            }
        };

        tracker.advance(TurnState::DirectiveCheck);
        let selection = match parse_directive(&text).map(|d| self.dispatcher.dispatch(&d)) {
            Some(DispatchOutcome::Handoff(selection)) => selection,
            other => {
                if let Some(outcome) = other {
                    log::info!(
                        "[TURN] Session {}: directive not actionable ({:?}), keeping reply",
                        session_id,
                        outcome
                    );
                }
                tracker.advance(TurnState::NoOp);
                session.store.append(Message::assistant(text.clone()));
                tracker.advance(TurnState::Idle);
                return Ok(TurnOutcome {
                    final_state: TurnState::NoOp,
                    agent: None,
                    content: text,
                });
            }
        };

        tracker.advance(TurnState::AgentHandoff);
        let agent = selection.agent;
        sink.emit(GatewayEvent::agent_handoff(
            &session_id,
            &agent.kind.to_string(),
            &selection.keyword,
            selection.fallback,
        ))
        .await?;

        let ctx = AgentContext {
            generation: &self.generation,
            artifacts: &self.artifacts,
            sink,
        };
        let reply = match agent.execute(session.store.all(), &ctx).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("[TURN] Session {}: {} failed: {}", session_id, agent.name, e);
                tracker.advance(TurnState::Idle);
                return Err(e);
            }
        };
        session.store.append(Message::assistant(reply.clone()));
        tracker.advance(TurnState::Idle);

        log::info!(
            "[TURN] Session {}: handled by {} ({} messages in history)",
            session_id,
            agent.name,
            session.store.len()
        );
        Ok(TurnOutcome {
            final_state: TurnState::AgentHandoff,
            agent: Some(agent.kind),
            content: reply,
        })
    }
}
