//! Exec command handler.

use anyhow::{Context, Result};
use lumina_core::config;

use crate::modes::{self, SessionOptions};

pub async fn run(
    prompt: &str,
    config: &config::Config,
    options: &SessionOptions,
    html: bool,
) -> Result<()> {
    modes::exec::run_exec(prompt, config, options, html)
        .await
        .context("execute prompt")
}
