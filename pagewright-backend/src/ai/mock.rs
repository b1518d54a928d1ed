//! Scripted model client for tests.
//!
//! Each call pops the next [`MockReply`] and records the history it was given.

use crate::ai::streaming::{create_stream_channel, StreamEvent, StreamReceiver};
use crate::ai::{AiError, Message};
use crate::config::GenerationConfig;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum MockReply {
    /// Stream these tokens, then finish normally
    Tokens(Vec<String>),
    /// Fail before any token is produced
    FailToStart(AiError),
    /// Stream some tokens, then report an in-band error
    FailMidStream(Vec<String>, String),
}

impl MockReply {
    /// Split text on spaces into tokens that concatenate back to it
    pub fn text(text: &str) -> Self {
        let mut tokens = Vec::new();
        let mut current = String::new();
        for c in text.chars() {
            current.push(c);
            if c == ' ' {
                tokens.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            tokens.push(current);
        }
        MockReply::Tokens(tokens)
    }
}

/// One recorded call
#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub input_messages: Vec<Message>,
    pub model: String,
}

pub struct MockAiClient {
    replies: Mutex<VecDeque<MockReply>>,
    trace: Mutex<Vec<TraceEntry>>,
}

impl MockAiClient {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            trace: Mutex::new(Vec::new()),
        }
    }

    pub fn stream_chat(
        &self,
        messages: &[Message],
        generation: &GenerationConfig,
    ) -> Result<StreamReceiver, AiError> {
        self.trace.lock().unwrap().push(TraceEntry {
            input_messages: messages.to_vec(),
            model: generation.model.clone(),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AiError::new("MockAiClient: no scripted reply left"))?;

        let (tokens, failure) = match reply {
            MockReply::FailToStart(error) => return Err(error),
            MockReply::Tokens(tokens) => (tokens, None),
            MockReply::FailMidStream(tokens, message) => (tokens, Some(message)),
        };

        let (tx, rx) = create_stream_channel(tokens.len() + 1);
        for content in tokens {
            let _ = tx.try_send(StreamEvent::ContentDelta { content });
        }
        let last = match failure {
            Some(message) => StreamEvent::Error { message },
            None => StreamEvent::Done {
                stop_reason: Some("stop".to_string()),
            },
        };
        let _ = tx.try_send(last);
        Ok(rx)
    }

    pub fn trace(&self) -> Vec<TraceEntry> {
        self.trace.lock().unwrap().clone()
    }
}
