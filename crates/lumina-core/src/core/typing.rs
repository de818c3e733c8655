//! Simulated typing reveal of an already-received response.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Reveal pacing, in milliseconds. Loaded from the `[typing]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Pause before the first token so the placeholder renders first.
    pub initial_delay_ms: u64,
    pub word_delay_ms: u64,
    /// Pause after tokens made only of `. , ; : ! ?`.
    pub punctuation_delay_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            word_delay_ms: 30,
            punctuation_delay_ms: 150,
        }
    }
}

impl TypingConfig {
    /// No pauses at all; the whole text is revealed token by token at once.
    pub fn instant() -> Self {
        Self {
            initial_delay_ms: 0,
            word_delay_ms: 0,
            punctuation_delay_ms: 0,
        }
    }

    fn delay_after(&self, token: &str) -> Duration {
        if is_punctuation(token) {
            Duration::from_millis(self.punctuation_delay_ms)
        } else {
            Duration::from_millis(self.word_delay_ms)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    Completed,
    /// Stopped early; whatever was revealed stays revealed.
    Cancelled,
}

/// Splits text into alternating word and whitespace-run tokens.
///
/// Concatenating the tokens yields the input exactly.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                tokens.push(&text[start..i]);
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }

    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// True for non-empty tokens made only of `. , ; : ! ?`.
pub fn is_punctuation(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '.' | ',' | ';' | ':' | '!' | '?'))
}

/// Reveals text token by token with punctuation-aware pacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypingAnimator {
    config: TypingConfig,
}

impl TypingAnimator {
    pub fn new(config: TypingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> TypingConfig {
        self.config
    }

    /// Reveals `full_text`, calling `on_reveal` with the accumulated prefix
    /// after each token. Ticks are strictly sequential.
    ///
    /// Returns `Cancelled` as soon as `cancel` fires; no further ticks run.
    pub async fn animate<F>(
        &self,
        full_text: &str,
        cancel: &CancellationToken,
        mut on_reveal: F,
    ) -> AnimationOutcome
    where
        F: FnMut(&str),
    {
        if !self.pause(Duration::from_millis(self.config.initial_delay_ms), cancel).await {
            return AnimationOutcome::Cancelled;
        }

        let tokens = tokenize(full_text);
        let mut revealed = String::with_capacity(full_text.len());

        for (i, token) in tokens.iter().enumerate() {
            if cancel.is_cancelled() {
                return AnimationOutcome::Cancelled;
            }
            revealed.push_str(token);
            on_reveal(&revealed);

            let is_last = i + 1 == tokens.len();
            if !is_last && !self.pause(self.config.delay_after(token), cancel).await {
                return AnimationOutcome::Cancelled;
            }
        }

        AnimationOutcome::Completed
    }

    /// Sleeps for `delay` unless cancelled first. Returns false on cancel.
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;

    #[test]
    fn test_tokenize_keeps_whitespace_runs() {
        assert_eq!(tokenize("Hi there!"), vec!["Hi", " ", "there!"]);
        assert_eq!(tokenize("  a\n\nb "), vec!["  ", "a", "\n\n", "b", " "]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_reconstructs_input() {
        let text = "Hola,  mundo .\n¿Qué tal?";
        assert_eq!(tokenize(text).concat(), text);
    }

    #[test]
    fn test_is_punctuation() {
        assert!(is_punctuation("."));
        assert!(is_punctuation("?!"));
        assert!(!is_punctuation("there!"));
        assert!(!is_punctuation(""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_animate_reveals_prefixes_in_order() {
        let animator = TypingAnimator::default();
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        let outcome = animator
            .animate("Hi there!", &cancel, |text| seen.push(text.to_string()))
            .await;

        assert_eq!(outcome, AnimationOutcome::Completed);
        assert_eq!(seen, vec!["Hi", "Hi ", "Hi there!"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_animate_paces_punctuation_longer() {
        let animator = TypingAnimator::default();
        let cancel = CancellationToken::new();
        let start = Instant::now();

        animator.animate("a . b", &cancel, |_| {}).await;

        // initial 100 + "a" 30 + " " 30 + "." 150 + " " 30
        assert_eq!(start.elapsed(), Duration::from_millis(340));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_freezes_partial_content() {
        let animator = TypingAnimator::default();
        let cancel = CancellationToken::new();
        let mut last = String::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(145)).await;
            canceller.cancel();
        });

        let outcome = animator
            .animate("one two three four", &cancel, |text| last = text.to_string())
            .await;

        assert_eq!(outcome, AnimationOutcome::Cancelled);
        // ticks at 100 ("one") and 130 ("one ") happen before the cancel
        assert_eq!(last, "one ");
    }

    #[tokio::test]
    async fn test_instant_config_reveals_everything() {
        let animator = TypingAnimator::new(TypingConfig::instant());
        let cancel = CancellationToken::new();
        let mut last = String::new();
        animator
            .animate("fast text", &cancel, |text| last = text.to_string())
            .await;
        assert_eq!(last, "fast text");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_reveals_nothing() {
        let animator = TypingAnimator::new(TypingConfig::instant());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut calls = 0;
        let outcome = animator.animate("text", &cancel, |_| calls += 1).await;
        assert_eq!(outcome, AnimationOutcome::Cancelled);
        assert_eq!(calls, 0);
    }
}
