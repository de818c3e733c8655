//! Read-aloud collaborators.

use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::{Child, Command};

/// Opaque "read this aloud" side effect. `speak` must return quickly; the
/// conversation never waits for speech to finish.
#[async_trait]
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str);
    fn stop(&self);

    /// Resolves once the current utterance has finished playing. Dropping
    /// the future stops playback.
    async fn finish(&self) {}
}

/// Speaker that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpeaker;

#[async_trait]
impl Speaker for NoopSpeaker {
    fn speak(&self, _text: &str) {}
    fn stop(&self) {}
}

/// Speaks by spawning an external TTS program (`espeak`, `say`, ...) with the
/// text as its last argument. Only one utterance plays at a time.
#[derive(Debug)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    current: Mutex<Option<Child>>,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current: Mutex::new(None),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn take_current(&self) -> Option<Child> {
        self.current.lock().ok().and_then(|mut guard| guard.take())
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.stop();

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => {
                if let Ok(mut guard) = self.current.lock() {
                    *guard = Some(child);
                }
            }
            Err(err) => {
                tracing::warn!(program = %self.program, error = %err, "failed to start speech command");
            }
        }
    }

    fn stop(&self) {
        if let Some(mut child) = self.take_current()
            && let Err(err) = child.start_kill()
        {
            tracing::debug!(error = %err, "speech command already exited");
        }
    }

    async fn finish(&self) {
        // The child is owned here, so a dropped future kills it on drop.
        let Some(mut child) = self.take_current() else {
            return;
        };
        match child.wait().await {
            Ok(status) if !status.success() => {
                tracing::warn!(program = %self.program, %status, "speech command failed");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(program = %self.program, error = %err, "failed to wait for speech command");
            }
        }
    }
}
