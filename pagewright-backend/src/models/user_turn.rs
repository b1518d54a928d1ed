use crate::ai::Message;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::path::PathBuf;

/// Prefix for image data URLs. Every image is announced as JPEG.
const IMAGE_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// A file delivered with a user turn: either a path on disk or inline base64
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub name: Option<String>,
    pub mime: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub data: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.mime.contains("image")
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.path.as_ref().map(|p| p.display().to_string()))
            .unwrap_or_else(|| self.mime.clone())
    }

    async fn read_bytes(&self) -> Result<Vec<u8>, String> {
        if let Some(data) = &self.data {
            return STANDARD
                .decode(data.trim())
                .map_err(|e| format!("Attachment '{}' is not valid base64: {}", self.label(), e));
        }
        if let Some(path) = &self.path {
            return tokio::fs::read(path)
                .await
                .map_err(|e| format!("Failed to read attachment '{}': {}", self.label(), e));
        }
        Err(format!("Attachment '{}' has neither path nor data", self.label()))
    }
}

/// An incoming user turn as delivered by the chat transport
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserTurn {
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl UserTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    /// Build the message to append to history.
    ///
    /// Without an image the content is the raw text. With images, only the
    /// first one is read and embedded; the rest are ignored.
    pub async fn into_message(self) -> Result<Message, String> {
        let mut images = self.attachments.iter().filter(|a| a.is_image());
        let Some(first) = images.next() else {
            return Ok(Message::user(self.text));
        };

        let ignored = images.count();
        if ignored > 0 {
            log::debug!("[TURN] Ignoring {} additional image attachment(s)", ignored);
        }

        let bytes = first.read_bytes().await?;
        let url = format!("{}{}", IMAGE_DATA_URL_PREFIX, STANDARD.encode(&bytes));
        Ok(Message::user_with_image(self.text, url))
    }
}
