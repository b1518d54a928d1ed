//! Actions an agent may request while it holds the conversation.

use crate::artifacts::ArtifactKind;
use crate::orchestrator::directive::Directive;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    UpdateArtifact { kind: ArtifactKind, contents: String },
    CompleteMilestone { number: u32 },
}

impl AgentAction {
    /// `None` when the directive names no agent action at all;
    /// `Some(Err)` when it does but the arguments don't fit.
    pub fn from_directive(directive: &Directive) -> Option<Result<Self, String>> {
        match directive.action.as_str() {
            "update_artifact" => Some(Self::parse_update(&directive.arguments)),
            "complete_milestone" => Some(Self::parse_complete(&directive.arguments)),
            _ => None,
        }
    }

    fn parse_update(arguments: &[Value]) -> Result<Self, String> {
        let [file, contents] = arguments else {
            return Err(format!(
                "expected 2 parameters (file, contents), got {}",
                arguments.len()
            ));
        };
        let file = file
            .as_str()
            .ok_or_else(|| "file name must be a string".to_string())?;
        let kind = ArtifactKind::from_file_name(file).ok_or_else(|| {
            format!(
                "unknown file '{}'; use plan.md, index.html or styles.css",
                file
            )
        })?;
        let contents = contents
            .as_str()
            .ok_or_else(|| "contents must be a string".to_string())?;
        Ok(AgentAction::UpdateArtifact {
            kind,
            contents: contents.to_string(),
        })
    }

    fn parse_complete(arguments: &[Value]) -> Result<Self, String> {
        let [number] = arguments else {
            return Err(format!(
                "expected 1 parameter (milestone number), got {}",
                arguments.len()
            ));
        };
        let number = match number {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| format!("'{}' is not a milestone number", number))?;
        Ok(AgentAction::CompleteMilestone { number })
    }
}
