//! Activity - dispatch の対象になる受信アイテム
//!
//! Transport 層の詳細（添付ファイル、カードなど）は扱いません。
//! dispatch に必要なのは kind と text だけです。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ActivityId;
use super::types::{self, TypeTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Message,
    Typing,
    ConversationUpdate,
    Event,
    EndOfConversation,
}

/// An incoming conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub kind: ActivityKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Sender identifier, if the channel provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Activity {
    pub fn new(kind: ActivityKind) -> Self {
        Self {
            id: ActivityId::generate(),
            kind,
            text: None,
            from: None,
            timestamp: Utc::now(),
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new(ActivityKind::Message).with_text(text)
    }

    pub fn typing() -> Self {
        Self::new(ActivityKind::Typing)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// The most specific type tag describing this activity.
    pub fn type_tag(&self) -> &'static TypeTag {
        match self.kind {
            ActivityKind::Message => &types::MESSAGE_ACTIVITY,
            ActivityKind::Typing => &types::TYPING_ACTIVITY,
            _ => &types::ACTIVITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_text_and_message_tag() {
        let activity = Activity::message("hello");
        assert_eq!(activity.text.as_deref(), Some("hello"));
        assert_eq!(activity.type_tag(), &types::MESSAGE_ACTIVITY);
    }

    #[test]
    fn other_kinds_fall_back_to_the_generic_tag() {
        let activity = Activity::new(ActivityKind::Event);
        assert_eq!(activity.type_tag(), &types::ACTIVITY);
        assert_eq!(Activity::typing().type_tag(), &types::TYPING_ACTIVITY);
    }

    #[test]
    fn kind_serializes_as_snake_case() {
        let s = serde_json::to_string(&ActivityKind::ConversationUpdate).unwrap();
        assert_eq!(s, "\"conversation_update\"");
    }
}
