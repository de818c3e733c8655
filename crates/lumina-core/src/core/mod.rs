//! Core module: UI-agnostic conversation domain and runtime.
//!
//! - `message`: message records and ids
//! - `events`: conversation events and phases
//! - `typing`: simulated typing reveal
//! - `conversation`: state and response-cycle controller
//! - `speech`: read-aloud collaborators
//! - `interrupt`: Ctrl+C handling

pub mod conversation;
pub mod events;
pub mod interrupt;
pub mod message;
pub mod speech;
pub mod typing;
