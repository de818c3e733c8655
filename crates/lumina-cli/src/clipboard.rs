//! Clipboard access for `:copy` and `:code`.
//!
//! Transports, in order:
//! 1. OSC 52 escape sequence (works over SSH), only when stdout is a terminal
//! 2. System clipboard via `arboard`

use std::io::{IsTerminal, Write};

use base64::Engine;

pub struct Clipboard;

impl Clipboard {
    /// Copies text to the clipboard, returning the transport that worked.
    pub fn copy(text: &str) -> Result<Transport, ClipboardError> {
        if std::io::stdout().is_terminal() && Self::copy_osc52(text).is_ok() {
            return Ok(Transport::Osc52);
        }

        Self::copy_system(text)?;
        Ok(Transport::System)
    }

    fn copy_osc52(text: &str) -> Result<(), ClipboardError> {
        let mut stdout = std::io::stdout();
        stdout
            .write_all(osc52_sequence(text).as_bytes())
            .map_err(|e| ClipboardError::Osc52(e.to_string()))?;
        stdout
            .flush()
            .map_err(|e| ClipboardError::Osc52(e.to_string()))?;
        Ok(())
    }

    fn copy_system(text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::System(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::System(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Osc52,
    System,
}

/// `ESC ] 52 ; c ; <base64> ESC \` targeting the system clipboard.
pub fn osc52_sequence(text: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text);
    format!("\x1b]52;c;{encoded}\x1b\\")
}

#[derive(Debug)]
pub enum ClipboardError {
    Osc52(String),
    System(String),
}

impl std::fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipboardError::Osc52(msg) => write!(f, "OSC 52 clipboard failed: {msg}"),
            ClipboardError::System(msg) => write!(f, "System clipboard failed: {msg}"),
        }
    }
}

impl std::error::Error for ClipboardError {}
