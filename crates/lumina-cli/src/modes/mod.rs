//! Run modes: interactive chat and one-shot exec.

pub mod chat;
pub mod command;
pub mod exec;
pub mod printer;

use std::sync::Arc;

use anyhow::Result;
use lumina_core::config::Config;
use lumina_core::core::speech::{CommandSpeaker, NoopSpeaker, Speaker};
use lumina_core::core::typing::{TypingAnimator, TypingConfig};
use lumina_core::providers::{self, models};
use lumina_core::render::{RenderOptions, SegmentOptions};
use lumina_core::{ConversationController, ConversationEvent};
use tokio::sync::mpsc;

/// Per-invocation overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub model: Option<String>,
    pub no_typing: bool,
    pub speak: bool,
}

fn build_speaker(config: &Config, read_aloud: bool) -> Arc<dyn Speaker> {
    if !read_aloud {
        return Arc::new(NoopSpeaker);
    }
    if let Some(command) = config.speech.command.as_deref() {
        Arc::new(CommandSpeaker::new(command, config.speech.args.clone()))
    } else {
        tracing::warn!("read-aloud enabled without [speech] command");
        eprintln!("Warning: read-aloud needs `command` in the [speech] config section.");
        Arc::new(NoopSpeaker)
    }
}

/// Builds a controller for the configured backend with CLI overrides applied.
///
/// # Errors
/// Returns an error if the model is unknown or the backend cannot be built.
pub fn build_controller(
    config: &Config,
    options: &SessionOptions,
    events: Option<mpsc::UnboundedSender<ConversationEvent>>,
) -> Result<ConversationController> {
    let model = options.model.clone().unwrap_or_else(|| config.model.clone());
    models::require(&model)?;

    let api = providers::build_backend(config)?;
    let typing = if options.no_typing {
        TypingConfig::instant()
    } else {
        config.typing
    };
    let read_aloud = options.speak || config.read_aloud;

    let mut builder = ConversationController::builder(api)
        .model(model)
        .animator(TypingAnimator::new(typing))
        .speaker(build_speaker(config, read_aloud), read_aloud);
    if let Some(events) = events {
        builder = builder.events(events);
    }
    Ok(builder.build())
}

pub fn render_options(config: &Config) -> RenderOptions {
    RenderOptions {
        markdown: config.markdown,
        segments: SegmentOptions::default(),
    }
}
