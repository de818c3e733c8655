//! Interactive chat loop.

use std::fs;
use std::future::Future;
use std::io::{self, IsTerminal, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use lumina_core::config::Config;
use lumina_core::core::interrupt::{self, InterruptedError};
use lumina_core::providers::models;
use lumina_core::render::{RenderOptions, code_blocks, render_transcript};
use lumina_core::{
    ConversationController, ConversationEvent, Message, ResponseOutcome, Sender,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::command::{self, HELP_TEXT, ReplCommand};
use super::printer::TerminalPrinter;
use super::{SessionOptions, build_controller, render_options};
use crate::clipboard::{Clipboard, Transport};

const TRANSCRIPT_TITLE: &str = "Lumina";

struct ChatSession {
    controller: ConversationController,
    events: mpsc::UnboundedReceiver<ConversationEvent>,
    printer: TerminalPrinter<io::Stdout>,
    render: RenderOptions,
}

/// Runs the chat REPL on stdin until `:q`, EOF or Ctrl+C at the prompt.
///
/// # Errors
/// Returns an error if setup fails, stdin cannot be read, or the user
/// interrupts at the prompt (`InterruptedError`).
pub async fn run_interactive_chat(config: &Config, options: &SessionOptions) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = build_controller(config, options, Some(tx))?;
    let mut session = ChatSession {
        controller,
        events: rx,
        printer: TerminalPrinter::new(io::stdout()),
        render: render_options(config),
    };

    let interactive = io::stdin().is_terminal();
    if interactive {
        println!(
            "Lumina ({} via {}). Type :help for commands, :q to quit.",
            session.controller.model(),
            session.controller.backend_name()
        );
    }
    tracing::info!(model = %session.controller.model(), "chat session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            print!("> ");
            io::stdout().flush().context("flush prompt")?;
        }

        let line = tokio::select! {
            line = lines.next_line() => line.context("read input")?,
            () = interrupt::wait_for_interrupt() => {
                println!();
                return Err(InterruptedError.into());
            }
        };
        let Some(line) = line else {
            break;
        };

        match command::parse(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Empty => {}
            ReplCommand::Help => println!("{HELP_TEXT}"),
            ReplCommand::Invalid(message) => println!("{message}"),
            ReplCommand::Send(text) => {
                let controller = session.controller.clone();
                let outcome = session.drive(controller.send_message(&text)).await?;
                report(&outcome);
            }
            ReplCommand::Regenerate(number) => session.regenerate(number).await?,
            ReplCommand::Edit { number, text } => session.edit(number, &text),
            ReplCommand::History => session.history(),
            ReplCommand::Model(id) => session.model(id.as_deref()),
            ReplCommand::Copy => session.copy_last(),
            ReplCommand::Code(number) => session.copy_code(number),
            ReplCommand::Export(path) => match session.export(&path) {
                Ok(count) => println!("Exported {count} messages to {}", path.display()),
                Err(e) => println!("Error: {e:#}"),
            },
        }
    }

    session.controller.stop_response();
    println!("Goodbye!");
    Ok(())
}

fn report(outcome: &ResponseOutcome) {
    match outcome {
        ResponseOutcome::Failed { error, .. } => eprintln!("Error: {error}"),
        ResponseOutcome::Stopped { .. } => println!("[stopped]"),
        ResponseOutcome::Completed { .. } | ResponseOutcome::Ignored => {}
    }
}

impl ChatSession {
    /// Runs a response cycle while printing its events. Ctrl+C stops the
    /// response instead of exiting.
    async fn drive<F>(&mut self, cycle: F) -> Result<ResponseOutcome>
    where
        F: Future<Output = ResponseOutcome>,
    {
        tokio::pin!(cycle);
        let outcome = loop {
            tokio::select! {
                outcome = &mut cycle => break outcome,
                Some(event) = self.events.recv() => self.printer.handle(&event)?,
                () = interrupt::wait_for_interrupt() => {
                    interrupt::reset();
                    self.controller.stop_response();
                }
            }
        };

        while let Ok(event) = self.events.try_recv() {
            self.printer.handle(&event)?;
        }
        self.printer.finish_line()?;
        Ok(outcome)
    }

    fn message_at(&self, number: usize) -> Option<Message> {
        self.controller.messages().into_iter().nth(number.checked_sub(1)?)
    }

    async fn regenerate(&mut self, number: Option<usize>) -> Result<()> {
        let target = match number {
            Some(n) => self.message_at(n),
            None => self
                .controller
                .messages()
                .into_iter()
                .rev()
                .find(|m| m.sender() == Sender::User),
        };
        let Some(target) = target else {
            println!("Nothing to regenerate.");
            return Ok(());
        };

        let controller = self.controller.clone();
        let outcome = self.drive(controller.regenerate(target.id())).await?;
        match outcome {
            ResponseOutcome::Ignored => println!("Nothing to regenerate."),
            other => report(&other),
        }
        Ok(())
    }

    fn edit(&self, number: usize, text: &str) {
        match self.message_at(number) {
            Some(message) if self.controller.edit_message(message.id(), text) => {
                println!("Edited message {number}. Use :regen {number} for a new reply.");
            }
            Some(_) => println!("Message {number} is not one of your messages."),
            None => println!("No message {number}."),
        }
    }

    fn history(&self) {
        let messages = self.controller.messages();
        if messages.is_empty() {
            println!("No messages yet.");
            return;
        }
        for (i, message) in messages.iter().enumerate() {
            let who = match message.sender() {
                Sender::User => "you",
                Sender::Assistant => "lumina",
                Sender::Error => "error",
            };
            let preview = message.content().lines().next().unwrap_or("");
            println!("[{}] {who} {}  {preview}", i + 1, local_time(message.timestamp()));
        }
    }

    fn model(&self, id: Option<&str>) {
        let Some(id) = id else {
            print!("{}", models::format_table(&self.controller.model()));
            return;
        };
        match self.controller.select_model(id) {
            Ok(()) => {
                if let Err(e) = Config::save_model(id) {
                    tracing::warn!(error = %e, "failed to save model to config");
                }
                println!("Model set to {id}");
            }
            Err(e) => println!("{e}"),
        }
    }

    fn last_reply(&self) -> Option<String> {
        self.controller
            .snapshot()
            .last_assistant_message()
            .map(|m| m.content().to_string())
    }

    fn copy_last(&self) {
        match self.last_reply() {
            Some(reply) => copy_and_report(&reply, "last reply"),
            None => println!("Nothing to copy yet."),
        }
    }

    fn copy_code(&self, number: usize) {
        let blocks = self.last_reply().map(|reply| code_blocks(&reply)).unwrap_or_default();
        match blocks.get(number - 1) {
            Some(code) => copy_and_report(code, &format!("code block {number}")),
            None => println!("The last reply has {} code block(s).", blocks.len()),
        }
    }

    fn export(&self, path: &Path) -> Result<usize> {
        let messages = self.controller.messages();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let content = if is_json {
            serde_json::to_string_pretty(&messages).context("serialize conversation")?
        } else {
            render_transcript(&messages, TRANSCRIPT_TITLE, self.render)
        };
        fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
        Ok(messages.len())
    }
}

fn copy_and_report(text: &str, what: &str) {
    match Clipboard::copy(text) {
        Ok(Transport::Osc52) => println!("Copied {what} (terminal clipboard)."),
        Ok(Transport::System) => println!("Copied {what}."),
        Err(e) => println!("Copy failed: {e}"),
    }
}

fn local_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_default()
}
