//! Direct Groq backend (OpenAI-compatible Chat Completions, non-streaming).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::ChatApi;
use super::models;
use super::shared::{
    ChatError, ChatRequest, ChatResult, HistoryMessage, USER_AGENT, classify_reqwest_error,
    resolve_api_key, resolve_base_url,
};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const BASE_URL_ENV: &str = "GROQ_BASE_URL";

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
/// Most recent history messages forwarded with each request.
const HISTORY_WINDOW: usize = 10;
const TEMPERATURE: f32 = 0.85;
const MAX_TOKENS: u32 = 1024;
const TOP_P: f32 = 0.9;

#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
    pub system_prompt: String,
}

impl GroqConfig {
    /// Resolves key and base URL from config values and the environment.
    ///
    /// # Errors
    /// Returns an error if no API key is available or the base URL is invalid.
    pub fn resolve(
        config_api_key: Option<&str>,
        config_base_url: Option<&str>,
        system_prompt: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            api_key: resolve_api_key(config_api_key, API_KEY_ENV, "groq")?,
            base_url: resolve_base_url(config_base_url, BASE_URL_ENV, DEFAULT_BASE_URL, "Groq")?,
            system_prompt: system_prompt.into(),
        })
    }
}

pub struct GroqClient {
    config: GroqConfig,
    http: reqwest::Client,
}

impl GroqClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GroqConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> CompletionRequest<'a> {
    fn new(vendor_model: &'a str, system_prompt: &'a str, request: &'a ChatRequest) -> Self {
        let history = &request.messages;
        let window = &history[history.len().saturating_sub(HISTORY_WINDOW)..];

        let mut messages = Vec::with_capacity(window.len() + 2);
        if !system_prompt.trim().is_empty() {
            messages.push(CompletionMessage {
                role: "system",
                content: system_prompt,
            });
        }
        messages.extend(window.iter().map(|m: &'a HistoryMessage| CompletionMessage {
            role: m.role.as_str(),
            content: m.content.as_str(),
        }));
        messages.push(CompletionMessage {
            role: "user",
            content: request.message.trim(),
        });

        Self {
            model: vendor_model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Fixed, user-facing messages for the statuses Groq documents.
fn status_error(status: u16, body: &str) -> ChatError {
    let message = match status {
        400 => "Solicitud inválida a Groq API",
        401 => "API key de Groq inválida o faltante",
        429 => "Límite de tasa excedido en Groq API",
        503 => "Servicio de Groq no disponible temporalmente",
        _ => return ChatError::http_status(status, body),
    };
    let error = ChatError::upstream(message);
    if body.is_empty() { error } else { error.with_details(body) }
}

#[async_trait]
impl ChatApi for GroqClient {
    fn name(&self) -> &str {
        "groq"
    }

    async fn send(&self, request: &ChatRequest) -> ChatResult<String> {
        let model = models::lookup(&request.model).ok_or_else(|| {
            let available: Vec<&str> = models::all().iter().map(|m| m.id).collect();
            ChatError::upstream(format!(
                "Modelo inválido. Modelos disponibles: {}",
                available.join(", ")
            ))
        })?;

        let body = CompletionRequest::new(model.vendor_id, &self.config.system_prompt, request);
        let url = format!("{}{}", self.config.base_url, CHAT_COMPLETIONS_PATH);
        tracing::debug!(%url, model = model.vendor_id, messages = body.messages.len(), "groq request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| classify_reqwest_error(&e))?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ChatError::parse(format!("Invalid Groq response: {e}")).with_details(text.clone()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ChatError::parse("Groq response has no message content").with_details(text))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::providers::shared::ChatErrorKind;

    fn client(base_url: String) -> GroqClient {
        GroqClient::new(GroqConfig {
            api_key: "test-key".to_string(),
            base_url,
            system_prompt: "Eres Lumina.".to_string(),
        })
        .unwrap()
    }

    fn request_with_history(turns: usize) -> ChatRequest {
        let messages = (0..turns)
            .map(|i| {
                if i % 2 == 0 {
                    HistoryMessage::user(format!("u{i}"))
                } else {
                    HistoryMessage::assistant(format!("a{i}"))
                }
            })
            .collect();
        ChatRequest {
            message: "  hello  ".to_string(),
            model: "gpt-oss-20b".to_string(),
            messages,
        }
    }

    #[tokio::test]
    async fn test_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hi there!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(server.uri()).send(&request_with_history(12)).await.unwrap();
        assert_eq!(reply, "Hi there!");

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["model"], "openai/gpt-oss-20b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 1024);

        let messages = body["messages"].as_array().unwrap();
        // system + last 10 history + user
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "u2");
        assert_eq!(messages[11], json!({"role": "user", "content": "hello"}));
    }

    #[tokio::test]
    async fn test_unknown_model_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let mut request = request_with_history(0);
        request.model = "gpt-5".to_string();
        let err = client(server.uri()).send(&request).await.unwrap_err();
        assert_eq!(err.kind, ChatErrorKind::Upstream);
        assert!(err.message.starts_with("Modelo inválido"));
    }

    #[tokio::test]
    async fn test_known_statuses_map_to_fixed_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "Invalid API Key"}})))
            .mount(&server)
            .await;

        let err = client(server.uri()).send(&request_with_history(0)).await.unwrap_err();
        assert_eq!(err.message, "API key de Groq inválida o faltante");
        assert!(err.details.unwrap().contains("Invalid API Key"));
    }

    #[tokio::test]
    async fn test_other_statuses_use_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "internal"}})))
            .mount(&server)
            .await;

        let err = client(server.uri()).send(&request_with_history(0)).await.unwrap_err();
        assert_eq!(err.message, "internal");
    }

    #[tokio::test]
    async fn test_empty_choices_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(server.uri()).send(&request_with_history(0)).await.unwrap_err();
        assert_eq!(err.kind, ChatErrorKind::Parse);
    }
}
