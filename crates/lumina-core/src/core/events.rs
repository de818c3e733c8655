//! Conversation event types.
//!
//! Front ends subscribe to these to mirror the conversation state. Events are
//! serializable so a transcript of a session can be dumped as JSON lines.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::{Message, MessageId};

/// Response-cycle phase of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// Request issued, waiting for the full response text.
    AwaitingResponse,
    /// Response text received and being revealed.
    Revealing,
    /// The last request failed; the next send starts a fresh cycle.
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingResponse => "awaiting_response",
            Phase::Revealing => "revealing",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Events emitted by the conversation controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// A message was added to the end of the conversation.
    MessageAppended { message: Message },

    /// A user message was edited in place.
    MessageEdited { id: MessageId, content: String },

    /// Messages after `after` were discarded before a regeneration.
    MessagesTruncated { after: MessageId },

    /// The revealed prefix of a message changed. `content` is the full
    /// current content, not a delta.
    ContentRevealed { id: MessageId, content: String },

    /// A message's sender or content was replaced after a failure.
    MessageFailed { message: Message },

    PhaseChanged { phase: Phase },

    /// The view should follow the newest content.
    ScrollToBottom,

    /// The response in `id` was fully revealed.
    ResponseCompleted { id: MessageId },
}
