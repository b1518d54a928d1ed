//! Detection of a structured directive in a completed model response.
//!
//! A directive is a response whose entire text is one JSON object:
//!
//! ```text
//! {"function_name": "call_agent", "parameters": ["planning"]}
//! ```
//!
//! Anything else is ordinary prose and yields `None`.

use serde::Deserialize;
use serde_json::Value;

/// A requested action with its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub action: String,
    pub arguments: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawDirective {
    function_name: String,
    #[serde(default)]
    parameters: Vec<Value>,
}

/// Interpret `text` as a directive. Never fails: malformed JSON, a non-object
/// value or mistyped fields all mean "no directive".
pub fn parse_directive(text: &str) -> Option<Directive> {
    match serde_json::from_str::<RawDirective>(text) {
        Ok(raw) => Some(Directive {
            action: raw.function_name,
            arguments: raw.parameters,
        }),
        Err(e) => {
            log::debug!("[DIRECTIVE] Response is not a directive: {}", e);
            None
        }
    }
}
