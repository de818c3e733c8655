//! Render command handler.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use lumina_core::config;
use lumina_core::render::render_message_html;

use crate::modes;

/// Renders a Markdown reply to an HTML fragment on stdout.
pub fn run(file: Option<&Path>, config: &config::Config) -> Result<()> {
    let content = match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("read stdin")?;
            buf
        }
    };
    println!("{}", render_message_html(&content, modes::render_options(config)));
    Ok(())
}
