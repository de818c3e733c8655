//! One-shot prompt: send, wait for the full reply, print it.

use anyhow::{Result, bail};
use lumina_core::config::Config;
use lumina_core::core::interrupt::{self, InterruptedError};
use lumina_core::render::render_message_html;
use lumina_core::ResponseOutcome;

use super::{SessionOptions, build_controller, render_options};

/// Sends `prompt` and prints the reply as plain text, or as an HTML fragment
/// when `html` is set. The typing animation is skipped. With read-aloud on,
/// returns once the reply has been spoken.
///
/// # Errors
/// Returns an error if the prompt is blank or the backend fails, and
/// `InterruptedError` on Ctrl+C.
pub async fn run_exec(
    prompt: &str,
    config: &Config,
    options: &SessionOptions,
    html: bool,
) -> Result<()> {
    let options = SessionOptions {
        no_typing: true,
        ..options.clone()
    };
    let controller = build_controller(config, &options, None)?;

    let outcome = tokio::select! {
        outcome = controller.send_message(prompt) => outcome,
        () = interrupt::wait_for_interrupt() => {
            controller.stop_response();
            return Err(InterruptedError.into());
        }
    };

    match outcome {
        ResponseOutcome::Completed { id } => {
            let reply = controller
                .snapshot()
                .get(id)
                .map(|m| m.content().to_string())
                .unwrap_or_default();
            if html {
                println!("{}", render_message_html(&reply, render_options(config)));
            } else {
                println!("{reply}");
            }

            tokio::select! {
                () = controller.finish_speaking() => Ok(()),
                () = interrupt::wait_for_interrupt() => {
                    controller.stop_response();
                    Err(InterruptedError.into())
                }
            }
        }
        ResponseOutcome::Failed { error, .. } => Err(error.into()),
        ResponseOutcome::Stopped { .. } => Err(InterruptedError.into()),
        ResponseOutcome::Ignored => bail!("Prompt is empty"),
    }
}
