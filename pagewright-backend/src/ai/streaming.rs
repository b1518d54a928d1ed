//! Streaming response types and utilities
//!
//! A model call produces a finite, non-restartable sequence of text
//! increments. Providers push them as [`StreamEvent`]s into a bounded channel;
//! consumers fold them into a [`StreamAccumulator`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Default channel capacity between a provider and its consumer
pub const DEFAULT_STREAM_BUFFER: usize = 32;

/// Events emitted during streaming response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Content is being generated incrementally
    ContentDelta {
        /// The new content chunk
        content: String,
    },
    /// Stream has completed
    Done {
        /// Stop reason (e.g., "stop", "length")
        stop_reason: Option<String>,
    },
    /// An error occurred after the stream had started
    Error {
        /// Error message
        message: String,
    },
}

/// Sender for stream events
pub type StreamSender = mpsc::Sender<StreamEvent>;

/// Receiver for stream events
pub type StreamReceiver = mpsc::Receiver<StreamEvent>;

/// Create a new stream channel with specified buffer size
pub fn create_stream_channel(buffer_size: usize) -> (StreamSender, StreamReceiver) {
    mpsc::channel(buffer_size)
}

/// Create a stream channel with default buffer size (32)
pub fn create_default_stream_channel() -> (StreamSender, StreamReceiver) {
    create_stream_channel(DEFAULT_STREAM_BUFFER)
}

/// Accumulator for building complete response from stream events
#[derive(Debug, Clone, Default)]
pub struct StreamAccumulator {
    /// Accumulated content, only ever appended to
    pub content: String,
    /// Number of content deltas received
    pub deltas: usize,
    /// Stop reason from Done event
    pub stop_reason: Option<String>,
    /// Any error that occurred
    pub error: Option<String>,
    finished: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a stream event and update accumulator state.
    /// Events arriving after completion are ignored.
    pub fn process_event(&mut self, event: StreamEvent) {
        if self.finished {
            return;
        }
        match event {
            StreamEvent::ContentDelta { content } => {
                self.content.push_str(&content);
                self.deltas += 1;
            }
            StreamEvent::Done { stop_reason } => {
                self.stop_reason = stop_reason;
                self.finished = true;
            }
            StreamEvent::Error { message } => {
                self.error = Some(message);
                self.finished = true;
            }
        }
    }

    /// Mark the stream exhausted when the producer hangs up without a Done event
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Check if the stream is complete
    pub fn is_complete(&self) -> bool {
        self.finished
    }
}
