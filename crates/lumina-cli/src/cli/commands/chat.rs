//! Chat command handler.

use anyhow::Result;
use lumina_core::config;

use crate::modes::{self, SessionOptions};

pub async fn run(config: &config::Config, options: &SessionOptions) -> Result<()> {
    modes::chat::run_interactive_chat(config, options).await
}
