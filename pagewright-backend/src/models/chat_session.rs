use crate::models::MessageStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One conversation context. Owns its message store exclusively.
#[derive(Debug)]
pub struct ChatSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub store: MessageStore,
}

impl ChatSession {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            store: MessageStore::with_system_prompt(system_prompt),
        }
    }

    pub fn transcript(&self) -> SessionTranscriptResponse {
        SessionTranscriptResponse {
            session_id: self.id.clone(),
            created_at: self.created_at,
            count: self.store.len(),
            messages: self.store.all().to_vec(),
        }
    }
}

/// Response containing session transcript
#[derive(Debug, Clone, Serialize)]
pub struct SessionTranscriptResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub count: usize,
    pub messages: Vec<crate::ai::Message>,
}
