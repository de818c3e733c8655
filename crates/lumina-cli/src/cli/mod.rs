//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lumina_core::config::{self, paths};
use lumina_core::core::interrupt;
use lumina_core::logging;

use crate::modes::SessionOptions;

mod commands;

#[derive(Parser)]
#[command(name = "lumina")]
#[command(version)]
#[command(about = "Lumina, a chat assistant in your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the model from config
    #[arg(short, long, global = true, env = "LUMINA_MODEL")]
    model: Option<String>,

    /// Show replies at once instead of word by word
    #[arg(long, global = true)]
    no_typing: bool,

    /// Read replies aloud with the configured speech command
    #[arg(long, global = true)]
    speak: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Send one prompt and print the reply
    Exec {
        /// The prompt to send
        #[arg(short, long)]
        prompt: String,

        /// Print the reply as an HTML fragment
        #[arg(long)]
        html: bool,
    },

    /// Render a Markdown reply file (or stdin) to HTML
    Render {
        /// File to render; reads stdin when omitted
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// List available models
    Models,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = interrupt::init() {
        eprintln!("Warning: Ctrl+C handling unavailable: {e}");
    }

    let config = config::Config::load().context("load config")?;
    let _log_guard = match logging::init(&paths::logs_dir(), &config.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli, config).await })
}

async fn dispatch(cli: Cli, config: config::Config) -> Result<()> {
    let Cli {
        command,
        model,
        no_typing,
        speak,
    } = cli;
    let options = SessionOptions {
        model,
        no_typing,
        speak,
    };

    // default to chat mode
    let Some(command) = command else {
        return commands::chat::run(&config, &options).await;
    };

    match command {
        Commands::Exec { prompt, html } => {
            commands::exec::run(&prompt, &config, &options, html).await
        }
        Commands::Render { file } => commands::render::run(file.as_deref(), &config),
        Commands::Models => {
            commands::models::list(options.model.as_deref().unwrap_or(&config.model));
            Ok(())
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
