//! Relay backend: a server that wraps the model call behind a small JSON
//! contract.
//!
//! Request: `{message, model, messages: [{role, content}]}`.
//! Response: `{success, response?, error?}`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::ChatApi;
use super::shared::{ChatError, ChatRequest, ChatResult, USER_AGENT, classify_reqwest_error, validate_url};

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Relay chat client.
pub struct RelayClient {
    url: String,
    http: reqwest::Client,
}

impl RelayClient {
    /// # Errors
    /// Returns an error if `url` is malformed or the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        validate_url(&url, "relay")?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { url, http })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatApi for RelayClient {
    fn name(&self) -> &str {
        "relay"
    }

    async fn send(&self, request: &ChatRequest) -> ChatResult<String> {
        tracing::debug!(url = %self.url, model = %request.model, history = request.messages.len(), "relay request");

        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| classify_reqwest_error(&e))?;
        if !status.is_success() {
            return Err(ChatError::http_status(status.as_u16(), &body));
        }

        let parsed: RelayResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::parse(format!("Invalid relay response: {e}")).with_details(body.clone()))?;

        if !parsed.success {
            let message = parsed
                .error
                .unwrap_or_else(|| "Error en la respuesta del servidor".to_string());
            return Err(ChatError::upstream(message));
        }

        parsed
            .response
            .ok_or_else(|| ChatError::parse("Relay response is missing 'response'").with_details(body))
    }
}
