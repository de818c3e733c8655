//! Built-in model registry.
//!
//! UI ids are what users type and what the relay receives; `vendor_id` is what
//! the Groq API expects.

use std::fmt::Write as _;

use anyhow::{Result, bail};

pub const DEFAULT_MODEL: &str = "gpt-oss-20b";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub vendor_id: &'static str,
    /// Shown in the interactive picker.
    pub featured: bool,
}

static MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "llama-3.1-8b-instant",
        display_name: "Llama 3.1 8B (Rápido)",
        vendor_id: "llama-3.1-8b-instant",
        featured: true,
    },
    ModelInfo {
        id: "gpt-oss-20b",
        display_name: "GPT OSS 20B",
        vendor_id: "openai/gpt-oss-20b",
        featured: true,
    },
    ModelInfo {
        id: "llama-3.1-70b-versatile",
        display_name: "Llama 3.1 70B Versatile",
        vendor_id: "llama-3.1-70b-versatile",
        featured: false,
    },
    ModelInfo {
        id: "mixtral-8x7b-32768",
        display_name: "Mixtral 8x7B",
        vendor_id: "mixtral-8x7b-32768",
        featured: false,
    },
    ModelInfo {
        id: "gemma2-9b-it",
        display_name: "Gemma 2 9B",
        vendor_id: "gemma2-9b-it",
        featured: false,
    },
];

pub fn all() -> &'static [ModelInfo] {
    MODELS
}

pub fn lookup(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

fn available_ids() -> String {
    MODELS.iter().map(|m| m.id).collect::<Vec<_>>().join(", ")
}

/// Validates a model id, returning its registry entry.
///
/// # Errors
/// Returns an error naming the available ids when `id` is unknown.
pub fn require(id: &str) -> Result<&'static ModelInfo> {
    match lookup(id) {
        Some(model) => Ok(model),
        None => bail!("Unknown model '{id}'. Available models: {}", available_ids()),
    }
}

/// Plain-text table of the registry, `current` marked with `*`.
pub fn format_table(current: &str) -> String {
    let width = MODELS.iter().map(|m| m.id.len()).max().unwrap_or(0);
    let mut out = String::new();
    for model in MODELS {
        let marker = if model.id == current { '*' } else { ' ' };
        let _ = writeln!(out, "{marker} {:<width$}  {}", model.id, model.display_name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_is_registered() {
        assert_eq!(require(DEFAULT_MODEL).unwrap().vendor_id, "openai/gpt-oss-20b");
    }

    #[test]
    fn test_unknown_model_lists_available() {
        let err = require("gpt-5").unwrap_err().to_string();
        assert!(err.contains("gpt-5"));
        assert!(err.contains("llama-3.1-8b-instant"));
    }

    #[test]
    fn test_table_marks_current() {
        let table = format_table("gemma2-9b-it");
        let line = table.lines().find(|l| l.contains("gemma2-9b-it")).unwrap();
        assert!(line.starts_with('*'));
        assert_eq!(table.lines().filter(|l| l.starts_with('*')).count(), 1);
    }
}
