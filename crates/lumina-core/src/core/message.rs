//! Conversation message records.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, ordered message identifier derived from the creation time in
/// milliseconds. Strictly increasing within one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for MessageId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out timestamp-derived ids that never repeat or go backwards.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MessageIdGenerator {
    last: u64,
}

impl MessageIdGenerator {
    pub(crate) fn next_id(&mut self) -> MessageId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.last = now.max(self.last + 1);
        MessageId(self.last)
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    Error,
}

impl Sender {
    /// Chat API role; error messages are never sent upstream.
    pub fn role(self) -> Option<&'static str> {
        match self {
            Sender::User => Some("user"),
            Sender::Assistant => Some("assistant"),
            Sender::Error => None,
        }
    }
}

/// A chat message. Fields are only mutated by the conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: MessageId,
    content: String,
    sender: Sender,
    timestamp: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_typing: bool,
}

impl Message {
    pub(crate) fn new(id: MessageId, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            sender,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            is_typing: false,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// ISO-8601 creation time.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// True while the assistant text is being revealed.
    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub(crate) fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub(crate) fn set_sender(&mut self, sender: Sender) {
        self.sender = sender;
    }

    pub(crate) fn set_typing(&mut self, typing: bool) {
        self.is_typing = typing;
    }
}
