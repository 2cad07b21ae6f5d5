// src/models/message.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::account::normalize_email;

/// Order-independent key of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
    low: String,
    high: String,
}

impl ParticipantPair {
    pub fn new(a: &str, b: &str) -> Self {
        let (a, b) = (normalize_email(a), normalize_email(b));
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> &str {
        &self.low
    }

    pub fn high(&self) -> &str {
        &self.high
    }

    pub fn contains(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.low == email || self.high == email
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: String,
    pub msg: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub sender: String,
    pub receiver: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "message")]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConversationPayload {
    #[validate(email(message = "Invalid sender"))]
    pub sender: String,
    #[validate(email(message = "Invalid receiver"))]
    pub receiver: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct IncomingMessage {
    #[validate(length(min = 1, message = "Message text is required"))]
    pub msg: String,
    #[validate(email(message = "Invalid message sender"))]
    pub sender: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NewMessagesPayload {
    #[validate(email(message = "Invalid sender"))]
    pub sender: String,
    #[validate(email(message = "Invalid receiver"))]
    pub receiver: String,
    #[serde(default)]
    #[validate(nested)]
    pub message: Vec<IncomingMessage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationResponse {
    pub conversation: Conversation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_and_case_independent() {
        assert_eq!(
            ParticipantPair::new("B@shop.in", "a@shop.in"),
            ParticipantPair::new("a@shop.in", "b@shop.in")
        );
        assert!(ParticipantPair::new("a@shop.in", "b@shop.in").contains("A@SHOP.IN"));
    }
}
