//! Prompt file helpers.

/// Default system prompt: the Lumina persona.
pub const LUMINA_PERSONA_PROMPT: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/lumina.md"));
