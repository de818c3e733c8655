//! Backend-agnostic request and error types.

use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::message::{Message, Sender};

/// Standard User-Agent header for Lumina API requests.
pub const USER_AGENT: &str = concat!("lumina/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Config resolution helpers
// ============================================================================

/// Resolves an API key with precedence: config > env.
///
/// # Errors
/// Returns an error if neither the config value nor the env var is set.
pub fn resolve_api_key(
    config_api_key: Option<&str>,
    env_var: &str,
    config_section: &str,
) -> Result<String> {
    if let Some(key) = config_api_key {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    std::env::var(env_var).context(format!(
        "No API key available. Set {env_var} or api_key in [providers.{config_section}]."
    ))
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen URL is malformed.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
    provider_name: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

pub(crate) fn validate_url(url: &str, provider_name: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {provider_name} URL: {url}"))?;
    Ok(())
}

// ============================================================================
// Request
// ============================================================================

/// Prior conversation turn as sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

impl HistoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// One chat request: the new user message plus the history before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    pub messages: Vec<HistoryMessage>,
}

impl ChatRequest {
    /// Builds a request from conversation messages. Error messages and
    /// empty placeholders are left out of the history.
    pub fn from_history<'a>(
        message: impl Into<String>,
        model: impl Into<String>,
        history: impl IntoIterator<Item = &'a Message>,
    ) -> Self {
        let messages = history
            .into_iter()
            .filter(|m| !m.content().trim().is_empty())
            .filter_map(|m| match m.sender() {
                Sender::User => Some(HistoryMessage::user(m.content())),
                Sender::Assistant => Some(HistoryMessage::assistant(m.content())),
                Sender::Error => None,
            })
            .collect();
        Self {
            message: message.into(),
            model: model.into(),
            messages,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatErrorKind {
    /// Request could not be sent or timed out
    Network,
    /// Non-success status or `success: false` body
    Upstream,
    /// The request was aborted by the user
    Cancelled,
    /// The response body did not have the expected shape
    Parse,
}

impl fmt::Display for ChatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatErrorKind::Network => write!(f, "network"),
            ChatErrorKind::Upstream => write!(f, "upstream"),
            ChatErrorKind::Cancelled => write!(f, "cancelled"),
            ChatErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from a chat backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Raw body or other diagnostics
    pub details: Option<String>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Network, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Upstream, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Parse, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ChatErrorKind::Cancelled, "Request cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ChatErrorKind::Cancelled
    }

    /// Builds an upstream error from a non-success HTTP response, preferring
    /// a message found in the JSON body.
    pub fn http_status(status: u16, body: &str) -> Self {
        let error = Self::upstream(extract_error_message(body).unwrap_or_else(|| format!("HTTP {status}")));
        if body.is_empty() {
            error
        } else {
            error.with_details(body)
        }
    }
}

/// Pulls `error` (string) or `error.message` out of a JSON error body.
fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error")?;
    error
        .as_str()
        .or_else(|| error.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ChatError {}

pub type ChatResult<T> = std::result::Result<T, ChatError>;

pub(crate) fn classify_reqwest_error(e: &reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::network(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ChatError::network(format!("Connection failed: {e}"))
    } else if e.is_decode() {
        ChatError::parse(format!("Invalid response body: {e}"))
    } else {
        ChatError::network(format!("Network error: {e}"))
    }
}
