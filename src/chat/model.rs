use chrono::{DateTime, Local, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Characters of the opening message used as the chat title
pub const CHAT_TITLE_LENGTH: usize = 30;

/// Who wrote a message in an AI chat
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    Ai,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub text: String,
    pub timestamp: String,
}

/// One conversation with the sous-chef
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AiChat {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, with = "crate::utils::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl AiChat {
    pub fn start(user_id: ObjectId, first_message: &str) -> Self {
        Self {
            id: None,
            user_id,
            title: chat_title(first_message),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append the user's message and the reply, stamped with the same time.
    pub fn push_exchange(&mut self, message: &str, reply: &str, timestamp: String) {
        self.messages.push(ChatMessage {
            message_type: MessageType::User,
            text: message.to_string(),
            timestamp: timestamp.clone(),
        });
        self.messages.push(ChatMessage {
            message_type: MessageType::Ai,
            text: reply.to_string(),
            timestamp,
        });
    }
}

pub fn chat_title(message: &str) -> String {
    let message = message.trim();
    if message.chars().count() > CHAT_TITLE_LENGTH {
        let truncated: String = message.chars().take(CHAT_TITLE_LENGTH).collect();
        format!("{}...", truncated)
    } else {
        message.to_string()
    }
}

pub fn message_timestamp(now: DateTime<Local>) -> String {
    now.format("%-I:%M:%S %p").to_string()
}

pub fn sous_chef_prompt(message: &str) -> String {
    format!(
        "You are Chilli's AI sous-chef, a friendly and knowledgeable cooking assistant. \
        Help with recipes, ingredient substitutions, cooking techniques, meal planning, \
        nutrition and food safety. Keep answers practical and concise, use short steps \
        or bullet points where they help, and politely steer unrelated questions back \
        to food and cooking.\n\nUser: {}\nSous-chef:",
        message
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub user_id: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiChatResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

impl From<AiChat> for AiChatResponse {
    fn from(chat: AiChat) -> Self {
        Self {
            id: chat.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: chat.user_id.to_hex(),
            title: chat.title,
            messages: chat.messages,
            created_at: chat.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn short_messages_become_the_title() {
        assert_eq!(chat_title("  Paneer ideas? "), "Paneer ideas?");
    }

    #[test]
    fn long_messages_are_truncated_with_ellipsis() {
        let title = chat_title("How do I make a really crispy dosa batter at home?");

        assert_eq!(title, "How do I make a really crispy ...");
        assert_eq!(title.chars().count(), CHAT_TITLE_LENGTH + 3);
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        let title = chat_title(&"🌶".repeat(40));
        assert_eq!(title, format!("{}...", "🌶".repeat(30)));
    }

    #[test]
    fn exchange_appends_user_then_ai() {
        let mut chat = AiChat::start(ObjectId::new(), "Hi");
        chat.push_exchange("Hi", "Hello, cook!", "3:04:05 PM".into());

        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].message_type, MessageType::User);
        assert_eq!(chat.messages[1].message_type, MessageType::Ai);
        assert_eq!(chat.messages[1].text, "Hello, cook!");
    }

    #[test]
    fn timestamp_is_a_twelve_hour_clock() {
        let time = Local.with_ymd_and_hms(2024, 5, 1, 15, 4, 5).unwrap();
        assert_eq!(message_timestamp(time), "3:04:05 PM");
    }

    #[test]
    fn prompt_embeds_the_raw_message() {
        let prompt = sous_chef_prompt("Can I swap ghee for butter?");
        assert!(prompt.contains("User: Can I swap ghee for butter?"));
    }
}
