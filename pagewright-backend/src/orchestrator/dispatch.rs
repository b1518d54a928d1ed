//! Maps a parsed directive to the agent that should take over the turn.

use crate::agents::{Agent, AgentKind, AgentRoster};
use crate::orchestrator::directive::Directive;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};

/// Actions the orchestrator itself understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    CallAgent,
}

/// The agent picked for a handoff and how it was picked
#[derive(Clone)]
pub struct AgentSelection {
    pub agent: Arc<Agent>,
    /// The argument as the model wrote it (non-strings are rendered as JSON)
    pub keyword: String,
    /// True when the keyword was not one of the known agent names
    pub fallback: bool,
}

impl std::fmt::Debug for AgentSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSelection")
            .field("agent", &self.agent.kind)
            .field("keyword", &self.keyword)
            .field("fallback", &self.fallback)
            .finish()
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    Handoff(AgentSelection),
    /// The directive names an action with no handler
    NotFound(String),
    /// The action exists but its arguments were unusable
    Rejected { action: String, reason: String },
}

/// "planning" selects the Planning Agent; every other value, including
/// non-strings, selects the Implementation Agent.
pub fn select_agent(roster: &AgentRoster, argument: &Value) -> AgentSelection {
    let keyword = match argument {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let parsed = argument
        .as_str()
        .and_then(|s| AgentKind::from_str(s).ok());

    let (kind, fallback) = match parsed {
        Some(AgentKind::Planning) => (AgentKind::Planning, false),
        Some(AgentKind::Implementation) => (AgentKind::Implementation, false),
        None => (AgentKind::Implementation, true),
    };
    AgentSelection {
        agent: roster.get(kind),
        keyword,
        fallback,
    }
}

pub struct Dispatcher {
    roster: AgentRoster,
}

impl Dispatcher {
    pub fn new(roster: AgentRoster) -> Self {
        Self { roster }
    }

    /// Decide what a directive asks for. Pure apart from logging.
    pub fn dispatch(&self, directive: &Directive) -> DispatchOutcome {
        let Ok(action) = Action::from_str(&directive.action) else {
            log::warn!(
                "[DISPATCH] No handler for action '{}', treating turn as a plain reply",
                directive.action
            );
            return DispatchOutcome::NotFound(directive.action.clone());
        };

        match action {
            Action::CallAgent => {
                let [argument] = directive.arguments.as_slice() else {
                    let reason = format!(
                        "expected exactly 1 parameter (agent name), got {}",
                        directive.arguments.len()
                    );
                    log::warn!("[DISPATCH] Rejected {}: {}", action, reason);
                    return DispatchOutcome::Rejected {
                        action: action.to_string(),
                        reason,
                    };
                };

                let selection = select_agent(&self.roster, argument);
                if selection.fallback {
                    log::warn!(
                        "[DISPATCH] Unknown agent keyword '{}', falling back to {}",
                        selection.keyword,
                        selection.agent.name
                    );
                } else {
                    log::info!(
                        "[DISPATCH] Handing off to {} (keyword '{}')",
                        selection.agent.name,
                        selection.keyword
                    );
                }
                DispatchOutcome::Handoff(selection)
            }
        }
    }
}
