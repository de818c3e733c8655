//! Prints conversation events to a terminal as plain text.

use std::io::{self, Write};

use lumina_core::{ConversationEvent, MessageId};

/// Writes revealed text incrementally: each reveal prints only the suffix not
/// printed yet for that message.
pub struct TerminalPrinter<W: Write> {
    out: W,
    /// Message being revealed and how many bytes of it are on screen.
    current: Option<(MessageId, usize)>,
}

impl<W: Write> TerminalPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out, current: None }
    }

    pub fn handle(&mut self, event: &ConversationEvent) -> io::Result<()> {
        match event {
            ConversationEvent::ContentRevealed { id, content } => self.reveal(*id, content),
            ConversationEvent::ResponseCompleted { .. } => self.finish_line(),
            ConversationEvent::MessageFailed { message } => {
                self.finish_line()?;
                writeln!(self.out, "{}", message.content())?;
                self.out.flush()
            }
            _ => Ok(()),
        }
    }

    fn reveal(&mut self, id: MessageId, content: &str) -> io::Result<()> {
        let printed = match self.current {
            Some((current, printed)) if current == id => printed,
            _ => {
                self.finish_line()?;
                0
            }
        };

        // A reveal never shrinks; anything else is reprinted whole.
        let suffix = if content.len() >= printed && content.is_char_boundary(printed) {
            &content[printed..]
        } else {
            writeln!(self.out)?;
            content
        };
        self.out.write_all(suffix.as_bytes())?;
        self.out.flush()?;
        self.current = Some((id, content.len()));
        Ok(())
    }

    /// Ends a partially printed reply with a newline.
    pub fn finish_line(&mut self) -> io::Result<()> {
        if let Some((_, printed)) = self.current.take()
            && printed > 0
        {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
