use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the explanation conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only record of the explanation conversation.
///
/// The first user turn carries the disease label the conversation started
/// from, which later stages fall back on when no classification is held.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::assistant(content));
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Content of the earliest user turn, if any.
    pub fn first_user(&self) -> Option<&str> {
        self.turns
            .iter()
            .find(|turn| turn.role == ChatRole::User)
            .map(|turn| turn.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_appends_in_order() {
        let mut history = ChatHistory::new();
        history.push_user("Mild_Demented");
        history.push_assistant("Here is what that means.");
        history.push_user("Is it treatable?");

        assert_eq!(history.len(), 3);
        assert_eq!(history.turns()[0].role, ChatRole::User);
        assert_eq!(history.turns()[1].role, ChatRole::Assistant);
        assert_eq!(history.turns()[2].content, "Is it treatable?");
    }

    #[test]
    fn first_user_turn_is_the_disease_label() {
        let mut history = ChatHistory::new();
        history.push_user("Very_Mild_Demented");
        history.push_assistant("Explanation");
        history.push_user("follow-up");

        assert_eq!(history.first_user(), Some("Very_Mild_Demented"));
        assert_eq!(ChatHistory::new().first_user(), None);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let turn = ChatTurn::assistant("hello");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hello");
    }
}
