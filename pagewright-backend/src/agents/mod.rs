//! Specialized agents that take over the conversation for one task.
//!
//! ## Prompt layering
//!
//! An agent never replaces the session's system prompt. Each call sends:
//!
//! ```text
//! [base system prompt] [agent layer] [session history...] [agent scratch...]
//! ```
//!
//! The agent layer (instructions, saving rules, current artifacts) is rebuilt
//! on every round and never written to the session store. Scratch turns hold
//! the agent's own actions and their results for the current invocation only.

pub mod actions;
pub mod prompts;

pub use actions::AgentAction;

use crate::ai::{AiClient, Message};
use crate::artifacts::ArtifactStore;
use crate::config::GenerationConfig;
use crate::gateway::events::EventSink;
use crate::gateway::protocol::GatewayEvent;
use crate::orchestrator::directive::parse_directive;
use crate::orchestrator::streamer::ResponseStreamer;
use crate::orchestrator::TurnError;
use serde::Serialize;
use std::sync::Arc;
use strum::{Display, EnumString};

/// Maximum number of action rounds in one agent invocation
const MAX_ACTION_ROUNDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Planning,
    Implementation,
}

impl AgentKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Planning => "Planning Agent",
            AgentKind::Implementation => "Implementation Agent",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            AgentKind::Planning => prompts::PLANNING_PROMPT,
            AgentKind::Implementation => prompts::IMPLEMENTATION_PROMPT,
        }
    }
}

/// What an agent needs from the turn that invoked it
pub struct AgentContext<'a> {
    pub generation: &'a GenerationConfig,
    pub artifacts: &'a ArtifactStore,
    pub sink: &'a EventSink,
}

pub struct Agent {
    pub kind: AgentKind,
    pub name: String,
    client: Arc<AiClient>,
    instructions: String,
}

impl Agent {
    pub fn new(kind: AgentKind, client: Arc<AiClient>) -> Self {
        Self {
            kind,
            name: kind.display_name().to_string(),
            client,
            instructions: kind.instructions().to_string(),
        }
    }

    /// Run the agent against the session history and return its final reply.
    pub async fn execute(
        &self,
        history: &[Message],
        ctx: &AgentContext<'_>,
    ) -> Result<String, TurnError> {
        log::info!(
            "[AGENT] {} taking over ({} messages of history)",
            self.name,
            history.len()
        );

        let streamer = ResponseStreamer::new(&self.client, ctx.generation, ctx.sink);
        let mut scratch: Vec<Message> = Vec::new();

        for round in 1..=MAX_ACTION_ROUNDS {
            let layer = self.build_layer(ctx.artifacts).await?;
            let messages = compose_messages(history, &layer, &scratch);
            let text = streamer.stream(&messages, &self.name).await?;

            let Some(directive) = parse_directive(&text) else {
                log::info!("[AGENT] {} finished after {} round(s)", self.name, round);
                return Ok(text);
            };
            let note = match AgentAction::from_directive(&directive) {
                None => {
                    log::warn!(
                        "[AGENT] {} replied with non-agent action '{}', treating as final",
                        self.name,
                        directive.action
                    );
                    return Ok(text);
                }
                Some(Err(reason)) => {
                    log::warn!(
                        "[AGENT] {} sent invalid '{}': {}",
                        self.name,
                        directive.action,
                        reason
                    );
                    format!(
                        "Action '{}' was rejected: {}. Fix the request or reply to the user.",
                        directive.action, reason
                    )
                }
                Some(Ok(action)) => self.apply(action, ctx).await?,
            };

            scratch.push(Message::assistant(text));
            scratch.push(Message::user(note));
        }

        log::warn!(
            "[AGENT] {} hit the limit of {} action rounds without a final reply",
            self.name,
            MAX_ACTION_ROUNDS
        );
        Ok(format!(
            "{} stopped after {} file operations without a summary. Ask for a status update to continue.",
            self.name, MAX_ACTION_ROUNDS
        ))
    }

    async fn apply(&self, action: AgentAction, ctx: &AgentContext<'_>) -> Result<String, TurnError> {
        match action {
            AgentAction::UpdateArtifact { kind, contents } => {
                ctx.artifacts
                    .write(kind, &contents)
                    .await
                    .map_err(TurnError::Artifact)?;
                ctx.sink
                    .emit(GatewayEvent::artifact_updated(
                        ctx.sink.session_id(),
                        kind.file_name(),
                    ))
                    .await?;
                Ok(format!(
                    "Saved {}. Continue with the next step, or reply to the user if you are done.",
                    kind
                ))
            }
            AgentAction::CompleteMilestone { number } => {
                let changed = ctx
                    .artifacts
                    .complete_milestone(number)
                    .await
                    .map_err(TurnError::Artifact)?;
                if !changed {
                    return Ok(format!(
                        "Milestone {} is not a pending milestone in plan.md. Nothing was changed.",
                        number
                    ));
                }
                ctx.sink
                    .emit(GatewayEvent::artifact_updated(ctx.sink.session_id(), "plan.md"))
                    .await?;
                Ok(format!("Milestone {} is now marked complete in plan.md.", number))
            }
        }
    }

    /// Agent system layer: instructions, saving rules and the current files
    async fn build_layer(&self, artifacts: &ArtifactStore) -> Result<String, TurnError> {
        let mut layer = format!(
            "# {}\n\n{}\n\n{}",
            self.name,
            self.instructions,
            prompts::ARTIFACT_ACTIONS_PROMPT
        );

        if let Some(plan) = artifacts.plan().await.map_err(TurnError::Artifact)? {
            layer.push_str("\n## PLAN PROGRESS\n\n");
            layer.push_str(&plan.progress_summary());
            layer.push('\n');
        }

        let files = artifacts.snapshot().await.map_err(TurnError::Artifact)?;
        if files.is_empty() {
            layer.push_str("\n## CURRENT ARTIFACTS\n\nNo files have been saved yet.\n");
        } else {
            layer.push_str("\n## CURRENT ARTIFACTS\n");
            for (kind, contents) in files {
                layer.push_str(&format!("\n### artifacts/{}\n\n```\n{}\n```\n", kind, contents));
            }
        }
        Ok(layer)
    }
}

/// Base prompt first, agent layer second, then history and scratch
fn compose_messages(history: &[Message], layer: &str, scratch: &[Message]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + scratch.len() + 1);
    let (base, rest) = match history.split_first() {
        Some((first, rest)) => (Some(first), rest),
        None => (None, history),
    };
    messages.extend(base.cloned());
    messages.push(Message::system(layer));
    messages.extend_from_slice(rest);
    messages.extend_from_slice(scratch);
    messages
}

/// The fixed set of agents, built once at startup
#[derive(Clone)]
pub struct AgentRoster {
    planning: Arc<Agent>,
    implementation: Arc<Agent>,
}

impl AgentRoster {
    pub fn new(client: Arc<AiClient>) -> Self {
        Self {
            planning: Arc::new(Agent::new(AgentKind::Planning, client.clone())),
            implementation: Arc::new(Agent::new(AgentKind::Implementation, client)),
        }
    }

    pub fn get(&self, kind: AgentKind) -> Arc<Agent> {
        match kind {
            AgentKind::Planning => self.planning.clone(),
            AgentKind::Implementation => self.implementation.clone(),
        }
    }
}
