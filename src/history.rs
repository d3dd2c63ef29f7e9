//! Conversation history

use std::sync::Mutex;

use crate::types::ChatMessage;

/// Ordered message store for one conversation.
pub trait HistoryStore: Send + Sync {
    /// Append messages in order.
    fn append(&self, messages: Vec<ChatMessage>);

    /// Snapshot of every message so far.
    fn all(&self) -> Vec<ChatMessage>;

    fn len(&self) -> usize {
        self.all().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local history.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    messages: Mutex<Vec<ChatMessage>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: Mutex::new(messages),
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove and return every message.
    pub fn take(&self) -> Vec<ChatMessage> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ChatMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HistoryStore for InMemoryHistory {
    fn append(&self, messages: Vec<ChatMessage>) {
        self.lock().extend(messages);
    }

    fn all(&self) -> Vec<ChatMessage> {
        self.lock().clone()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    #[test]
    fn appends_in_order() {
        let history = InMemoryHistory::with_messages(vec![ChatMessage::system("be brief")]);
        history.append(vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")]);
        let roles: Vec<MessageRole> = history.all().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
        assert_eq!(history.len(), 3);
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn take_drains_messages() {
        let history = InMemoryHistory::new();
        history.append(vec![ChatMessage::user("hi")]);
        let taken = history.take();
        assert_eq!(taken, vec![ChatMessage::user("hi")]);
        assert!(history.is_empty());
    }
}
