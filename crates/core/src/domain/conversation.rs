use serde::{Deserialize, Serialize};

use crate::domain::{ContactFieldTypeId, ContactId, ContactRef, ConversationId, MessageId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    Me,
    Them,
}

impl Author {
    pub const NAMES: &'static [&'static str] = &["me", "them"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "me" => Some(Self::Me),
            "them" => Some(Self::Them),
            _ => None,
        }
    }

    pub fn is_me(self) -> bool {
        matches!(self, Self::Me)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub contact: ContactRef,
    #[serde(default)]
    pub happened_at: Option<String>,
    #[serde(default)]
    pub contact_field_type_id: Option<ContactFieldTypeId>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub written_by_me: bool,
    #[serde(default)]
    pub written_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConversation {
    pub contact_id: ContactId,
    pub happened_at: String,
    pub contact_field_type_id: ContactFieldTypeId,
}

/// The owning contact is never taken from the caller; it is read back from
/// the conversation before a message is appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub contact_id: ContactId,
    pub written_at: String,
    pub written_by_me: bool,
    pub content: String,
}
