use crate::ai::Message;

/// Ordered, append-only conversation log for one session.
///
/// The first entry is the system prompt, fixed at construction. There is no
/// way to remove, reorder or edit an entry once appended.
#[derive(Debug, Clone)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Full history, in conversational order, as submitted to the model
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    #[cfg(test)]
    pub fn system_prompt(&self) -> String {
        self.messages
            .first()
            .map(|m| m.content.as_text())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Number of turns with the given role
    #[cfg(test)]
    pub fn count_role(&self, role: crate::ai::MessageRole) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}
