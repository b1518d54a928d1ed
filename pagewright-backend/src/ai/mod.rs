pub mod openai;
pub mod streaming;
pub mod types;

#[cfg(test)]
pub mod mock;

#[cfg(test)]
pub use mock::{MockAiClient, MockReply};
pub use openai::OpenAIClient;
pub use streaming::{StreamAccumulator, StreamEvent, StreamReceiver};
pub use types::AiError;

use crate::config::GenerationConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// URL wrapper used by image parts (`{"url": "data:image/jpeg;base64,..."}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One part of a multimodal message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Message content: plain text, or an ordered list of text/image parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text view of the content. Image parts are skipped.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn is_multimodal(&self) -> bool {
        matches!(self, MessageContent::Parts(_))
    }

    /// Number of image parts carried by this content
    pub fn image_count(&self) -> usize {
        match self {
            MessageContent::Text(_) => 0,
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|part| matches!(part, ContentPart::ImageUrl { .. }))
                .count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// User turn carrying text plus one image, addressed by a data URL
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }
}

/// Unified AI client over the configured provider
pub enum AiClient {
    OpenAI(OpenAIClient),
    #[cfg(test)]
    Mock(MockAiClient),
}

impl AiClient {
    /// Start a streamed chat completion.
    ///
    /// Returns `Err` when the call cannot start. Once the receiver is handed
    /// back, later failures arrive in-band as [`StreamEvent::Error`].
    pub async fn stream_chat(
        &self,
        messages: &[Message],
        generation: &GenerationConfig,
    ) -> Result<StreamReceiver, AiError> {
        match self {
            AiClient::OpenAI(client) => client.stream_chat(messages, generation).await,
            #[cfg(test)]
            AiClient::Mock(client) => client.stream_chat(messages, generation),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            AiClient::OpenAI(_) => "openai",
            #[cfg(test)]
            AiClient::Mock(_) => "mock",
        }
    }
}
