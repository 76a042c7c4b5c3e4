//! AgriBoost assistant chat: a rolling conversation where each turn sends
//! the last few messages as context.

use tracing::warn;

use crate::api::gemini::GeminiClient;
use crate::models::{ChatMessage, ChatRole};
use crate::services::GENERATION_FALLBACK;

pub const SYSTEM_INSTRUCTION: &str = "You are AgriBoost, an expert agriculture AI \
    assistant. You help farmers with decisions. Answer concisely. You support Tamil \
    and English. If the user asks in Tamil, reply in Tamil.";

/// How many trailing messages are sent as conversation context
const CONTEXT_MESSAGES: usize = 5;

/// One user's conversation with the assistant. Lives only for the session;
/// nothing is persisted.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Prompt carrying the last few turns of context. The pending user
    /// message is already part of the history at this point.
    fn build_prompt(&self, user_text: &str) -> String {
        let start = self.messages.len().saturating_sub(CONTEXT_MESSAGES);
        let history: Vec<String> = self.messages[start..]
            .iter()
            .map(|m| format!("{}: {}", m.role, m.text))
            .collect();

        format!(
            "History:\n{}\nUser: {}\nModel:",
            history.join("\n"),
            user_text
        )
    }

    /// Send a user message and return the assistant's reply. Both sides of
    /// the exchange are appended to the session history; provider failures
    /// degrade to a static fallback reply.
    pub async fn send(&mut self, client: &GeminiClient, user_text: &str) -> String {
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            text: user_text.to_string(),
        });

        let prompt = self.build_prompt(user_text);
        let response = client
            .generate_text(&prompt, Some(SYSTEM_INSTRUCTION))
            .await
            .unwrap_or_else(|e| {
                warn!("Chat generation failed: {}", e);
                GENERATION_FALLBACK.to_string()
            });

        self.messages.push(ChatMessage {
            role: ChatRole::Model,
            text: response.clone(),
        });
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: ChatRole, text: &str) -> ChatMessage {
        ChatMessage {
            role,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_build_prompt_includes_roles() {
        let mut session = ChatSession::new();
        session.messages.push(message(ChatRole::User, "When to sow paddy?"));
        session.messages.push(message(ChatRole::Model, "June onwards."));

        let prompt = session.build_prompt("And wheat?");
        assert!(prompt.starts_with("History:\n"));
        assert!(prompt.contains("user: When to sow paddy?"));
        assert!(prompt.contains("model: June onwards."));
        assert!(prompt.ends_with("User: And wheat?\nModel:"));
    }

    #[test]
    fn test_build_prompt_keeps_only_recent_context() {
        let mut session = ChatSession::new();
        for i in 0..8 {
            session.messages.push(message(ChatRole::User, &format!("q{}", i)));
        }

        let prompt = session.build_prompt("latest");
        assert!(!prompt.contains("q0"));
        assert!(!prompt.contains("q2"));
        assert!(prompt.contains("q3"));
        assert!(prompt.contains("q7"));
    }
}
