//! Chat backends.

pub mod groq;
pub mod models;
pub mod relay;
pub mod shared;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

pub use groq::{GroqClient, GroqConfig};
pub use relay::RelayClient;
pub use shared::{
    ChatError, ChatErrorKind, ChatRequest, ChatResult, HistoryMessage, resolve_api_key,
    resolve_base_url,
};

use crate::config::{BackendKind, Config};

/// A chat service that turns a request into the complete response text.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Backend name for logs and status display.
    fn name(&self) -> &str;

    /// Sends one request. The full response text is returned; there is no
    /// streaming.
    async fn send(&self, request: &ChatRequest) -> ChatResult<String>;
}

/// Builds the backend selected in config.
///
/// # Errors
/// Returns an error if the backend's credentials or URL are missing or invalid.
pub fn build_backend(config: &Config) -> Result<Arc<dyn ChatApi>> {
    match config.backend {
        BackendKind::Groq => {
            let groq = &config.providers.groq;
            let groq_config = GroqConfig::resolve(
                groq.api_key.as_deref(),
                groq.base_url.as_deref(),
                config.effective_system_prompt()?,
            )?;
            Ok(Arc::new(GroqClient::new(groq_config)?))
        }
        BackendKind::Relay => {
            let url = config
                .providers
                .relay
                .url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .context("The relay backend needs url in [providers.relay].")?;
            Ok(Arc::new(RelayClient::new(url)?))
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted backend for controller tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    pub(crate) enum Reply {
        Text(String),
        Fail(ChatError),
        /// Waits before answering.
        Delayed(Duration, String),
    }

    #[derive(Default)]
    pub(crate) struct ScriptedChatApi {
        replies: Mutex<VecDeque<Reply>>,
        pub(crate) requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedChatApi {
        pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatApi for ScriptedChatApi {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, request: &ChatRequest) -> ChatResult<String> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Text(text)) => Ok(text),
                Some(Reply::Fail(error)) => Err(error),
                Some(Reply::Delayed(delay, text)) => {
                    tokio::time::sleep(delay).await;
                    Ok(text)
                }
                None => Err(ChatError::upstream("no scripted reply")),
            }
        }
    }
}
