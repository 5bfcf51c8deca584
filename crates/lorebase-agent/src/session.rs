//! Per-tenant conversation history.

use lorebase_core::types::Message;

/// Ordered message history for one tenant.
///
/// Mutated only through [`push_turn`](Self::push_turn), so the history can
/// never hold half a turn: a user message always arrives together with the
/// full assistant response.
#[derive(Debug, Default)]
pub struct ConversationSession {
    messages: Vec<Message>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed turns, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append one completed exchange.
    pub fn push_turn(&mut self, user: &str, assistant: &str) {
        self.messages.push(Message::user(user));
        self.messages.push(Message::assistant(assistant));
    }

    /// Forget the whole conversation.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorebase_core::types::Role;

    #[test]
    fn test_turns_are_committed_in_pairs() {
        let mut session = ConversationSession::new();
        assert!(session.is_empty());

        session.push_turn("hello", "hi there");
        session.push_turn("how are you", "fine");

        assert_eq!(session.len(), 4);
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(session.messages()[1].content, "hi there");
    }

    #[test]
    fn test_clear_empties_history() {
        let mut session = ConversationSession::new();
        session.push_turn("a", "b");
        session.clear();
        assert!(session.is_empty());
    }
}
