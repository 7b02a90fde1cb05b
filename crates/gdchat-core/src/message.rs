use serde::{Deserialize, Serialize};

/// Origin of a message. Serialized lowercase so the stored blob stays a
/// plain array of `{"role": "user", "content": "..."}` pairs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Ordered, append-only log of the conversation, system notices included.
/// The controller appends; only an explicit clear empties it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn add_bot_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::bot(content));
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::system(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Bot).unwrap(), "\"bot\"");
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
    }

    #[test]
    fn history_serializes_as_plain_array() {
        let mut history = ConversationHistory::new();
        history.add_user_message("oi");
        history.add_bot_message("olá");

        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(
            json,
            r#"[{"role":"user","content":"oi"},{"role":"bot","content":"olá"}]"#
        );
    }

    #[test]
    fn history_preserves_insertion_order() {
        let mut history = ConversationHistory::new();
        history.add_user_message("first");
        history.add_bot_message("second");
        history.add_system_message("third");

        let roles: Vec<Role> = history.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Bot, Role::System]);
        assert_eq!(history.last_message().unwrap().content, "third");
    }
}
