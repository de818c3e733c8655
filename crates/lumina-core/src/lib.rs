//! Core Lumina library (rendering pipeline, conversation, backends, config).

pub mod config;
pub mod core;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod render;

pub use crate::core::conversation::{ConversationController, ConversationState, ResponseOutcome};
pub use crate::core::events::{ConversationEvent, Phase};
pub use crate::core::message::{Message, MessageId, Sender};
