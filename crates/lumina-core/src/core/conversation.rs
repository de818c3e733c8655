//! Conversation state and the response cycle.
//!
//! `ConversationState` is only mutated through the operations below.
//! `ConversationController` drives one response cycle at a time:
//! request, reveal, completion. A cycle can be stopped at any point, which
//! cancels both the network call and the reveal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::events::{ConversationEvent, Phase};
use super::message::{Message, MessageId, MessageIdGenerator, Sender};
use super::speech::{NoopSpeaker, Speaker};
use super::typing::{AnimationOutcome, TypingAnimator};
use crate::providers::{ChatApi, ChatError, ChatRequest, models};
use crate::render::speech::prepare_for_speech;

/// Placeholder content after a failed send.
pub const SEND_FAILED_MESSAGE: &str =
    "Lo siento, ha ocurrido un error al procesar tu mensaje. Por favor, inténtalo de nuevo.";

const REGENERATE_FAILED_PREFIX: &str = "Error al regenerar la respuesta";

/// Messages plus the flags of the response cycle in flight.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    phase: Phase,
    is_responding: bool,
    is_regenerating: bool,
    is_typing: bool,
    ids: MessageIdGenerator,
}

impl ConversationState {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_responding(&self) -> bool {
        self.is_responding
    }

    pub fn is_regenerating(&self) -> bool {
        self.is_regenerating
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    /// Newest assistant message with content.
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender() == Sender::Assistant && !m.content().is_empty())
    }

    fn append(&mut self, sender: Sender, content: impl Into<String>) -> Message {
        let message = Message::new(self.ids.next_id(), sender, content);
        self.messages.push(message.clone());
        message
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id() == id)
    }

    fn index_of(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id() == id)
    }

    fn begin_cycle(&mut self, regenerating: bool) {
        self.is_responding = true;
        self.is_regenerating = regenerating;
        self.is_typing = true;
        self.phase = Phase::AwaitingResponse;
    }

    fn end_cycle(&mut self, phase: Phase) {
        self.is_responding = false;
        self.is_regenerating = false;
        self.is_typing = false;
        self.phase = phase;
        for message in &mut self.messages {
            message.set_typing(false);
        }
    }
}

/// Result of a send or regenerate call.
#[derive(Debug, Clone)]
pub enum ResponseOutcome {
    /// Blank input, unknown target, or a response already in flight.
    Ignored,
    Completed { id: MessageId },
    /// The request failed; the message `id` now shows the failure.
    Failed { id: MessageId, error: ChatError },
    /// Stopped by the user; `id` keeps whatever was revealed.
    Stopped { id: MessageId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleKind {
    Send,
    Regenerate,
}

struct Inner {
    api: Arc<dyn ChatApi>,
    state: Mutex<ConversationState>,
    cancel: Mutex<Option<CancellationToken>>,
    model: Mutex<String>,
    animator: TypingAnimator,
    speaker: Arc<dyn Speaker>,
    read_aloud: AtomicBool,
    events: Option<mpsc::UnboundedSender<ConversationEvent>>,
}

/// Builder for [`ConversationController`].
pub struct ConversationBuilder {
    api: Arc<dyn ChatApi>,
    model: String,
    animator: TypingAnimator,
    speaker: Arc<dyn Speaker>,
    read_aloud: bool,
    events: Option<mpsc::UnboundedSender<ConversationEvent>>,
}

impl ConversationBuilder {
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn animator(mut self, animator: TypingAnimator) -> Self {
        self.animator = animator;
        self
    }

    #[must_use]
    pub fn speaker(mut self, speaker: Arc<dyn Speaker>, read_aloud: bool) -> Self {
        self.speaker = speaker;
        self.read_aloud = read_aloud;
        self
    }

    #[must_use]
    pub fn events(mut self, sender: mpsc::UnboundedSender<ConversationEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn build(self) -> ConversationController {
        ConversationController {
            inner: Arc::new(Inner {
                api: self.api,
                state: Mutex::new(ConversationState::default()),
                cancel: Mutex::new(None),
                model: Mutex::new(self.model),
                animator: self.animator,
                speaker: self.speaker,
                read_aloud: AtomicBool::new(self.read_aloud),
                events: self.events,
            }),
        }
    }
}

/// Owns a conversation and runs its response cycles.
///
/// Cheap to clone; clones share the same conversation.
#[derive(Clone)]
pub struct ConversationController {
    inner: Arc<Inner>,
}

impl ConversationController {
    pub fn builder(api: Arc<dyn ChatApi>) -> ConversationBuilder {
        ConversationBuilder {
            api,
            model: models::DEFAULT_MODEL.to_string(),
            animator: TypingAnimator::default(),
            speaker: Arc::new(NoopSpeaker),
            read_aloud: false,
            events: None,
        }
    }

    fn state(&self) -> MutexGuard<'_, ConversationState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.inner.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ConversationEvent) {
        if let Some(events) = &self.inner.events {
            let _ = events.send(event);
        }
    }

    fn emit_phase(&self, phase: Phase) {
        self.emit(ConversationEvent::PhaseChanged { phase });
        self.emit(ConversationEvent::ScrollToBottom);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Copy of the current state.
    pub fn snapshot(&self) -> ConversationState {
        self.state().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn is_responding(&self) -> bool {
        self.state().is_responding
    }

    pub fn model(&self) -> String {
        self.inner
            .model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn backend_name(&self) -> &str {
        self.inner.api.name()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Switches the model used by the next request.
    ///
    /// # Errors
    /// Returns an error if the id is not in the registry.
    pub fn select_model(&self, id: &str) -> Result<()> {
        models::require(id)?;
        *self.inner.model.lock().unwrap_or_else(PoisonError::into_inner) = id.to_string();
        tracing::info!(model = id, "model selected");
        Ok(())
    }

    /// Waits until the reply being read aloud has finished. Returns at once
    /// when nothing is playing. Dropping the future stops playback.
    pub async fn finish_speaking(&self) {
        let speaker = Arc::clone(&self.inner.speaker);
        speaker.finish().await;
    }

    pub fn set_read_aloud(&self, enabled: bool) {
        self.inner.read_aloud.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.inner.speaker.stop();
        }
    }

    /// Sends a user message and reveals the reply.
    ///
    /// Blank text, or a response already in flight, is ignored without any
    /// state change.
    pub async fn send_message(&self, text: &str) -> ResponseOutcome {
        if text.trim().is_empty() {
            return ResponseOutcome::Ignored;
        }

        let (request, placeholder, token) = {
            let mut state = self.state();
            if state.is_responding {
                tracing::debug!("send ignored: response in flight");
                return ResponseOutcome::Ignored;
            }

            let history = state.messages.clone();
            let user = state.append(Sender::User, text);
            let placeholder = state.append(Sender::Assistant, "");
            state.begin_cycle(false);
            let token = self.arm_cancel();

            self.emit(ConversationEvent::MessageAppended { message: user });
            self.emit(ConversationEvent::MessageAppended {
                message: placeholder.clone(),
            });
            self.emit_phase(Phase::AwaitingResponse);

            let request = ChatRequest::from_history(text, self.model(), &history);
            (request, placeholder.id(), token)
        };

        self.run_cycle(CycleKind::Send, placeholder, request, token).await
    }

    /// Replaces the content of a user message. No response is triggered.
    ///
    /// Returns false for unknown ids, non-user messages and blank content.
    pub fn edit_message(&self, id: MessageId, new_content: &str) -> bool {
        if new_content.trim().is_empty() {
            return false;
        }
        let mut state = self.state();
        let Some(message) = state.get_mut(id) else {
            return false;
        };
        if message.sender() != Sender::User {
            return false;
        }
        message.set_content(new_content);
        self.emit(ConversationEvent::MessageEdited {
            id,
            content: new_content.to_string(),
        });
        true
    }

    /// Discards everything after the user message `id` (or the nearest user
    /// message before it) and asks for a new reply to it.
    pub async fn regenerate(&self, id: MessageId) -> ResponseOutcome {
        let (request, placeholder, token) = {
            let mut state = self.state();
            if state.is_regenerating || state.is_responding {
                tracing::debug!("regenerate ignored: response in flight");
                return ResponseOutcome::Ignored;
            }
            let Some(index) = state.index_of(id) else {
                return ResponseOutcome::Ignored;
            };
            let Some(user_index) = state.messages[..=index]
                .iter()
                .rposition(|m| m.sender() == Sender::User)
            else {
                return ResponseOutcome::Ignored;
            };

            let user = state.messages[user_index].clone();
            state.messages.truncate(user_index + 1);
            let history = state.messages[..user_index].to_vec();
            let placeholder = state.append(Sender::Assistant, "");
            state.begin_cycle(true);
            let token = self.arm_cancel();

            self.emit(ConversationEvent::MessagesTruncated { after: user.id() });
            self.emit(ConversationEvent::MessageAppended {
                message: placeholder.clone(),
            });
            self.emit_phase(Phase::AwaitingResponse);

            let request = ChatRequest::from_history(user.content(), self.model(), &history);
            (request, placeholder.id(), token)
        };

        self.run_cycle(CycleKind::Regenerate, placeholder, request, token).await
    }

    /// Stops the response in flight, if any: the request result is dropped,
    /// the reveal halts, speech stops and all flags go back to idle.
    ///
    /// Returns whether a response was in flight.
    pub fn stop_response(&self) -> bool {
        let token = self.cancel_slot().take();
        let was_active = token.is_some();
        if let Some(token) = token {
            token.cancel();
        }
        self.inner.speaker.stop();

        let mut state = self.state();
        let changed = state.phase != Phase::Idle || state.is_responding;
        state.end_cycle(Phase::Idle);
        if changed {
            tracing::info!("response stopped");
            self.emit_phase(Phase::Idle);
        }
        was_active
    }

    // ------------------------------------------------------------------
    // Response cycle
    // ------------------------------------------------------------------

    fn arm_cancel(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel_slot() = Some(token.clone());
        token
    }

    /// Clears the slot after a cycle ends on its own. Callers hold the state
    /// lock and have checked that `token` is not cancelled, so the slot still
    /// holds this cycle's token.
    fn disarm_cancel(&self) {
        self.cancel_slot().take();
    }

    async fn run_cycle(
        &self,
        kind: CycleKind,
        id: MessageId,
        request: ChatRequest,
        token: CancellationToken,
    ) -> ResponseOutcome {
        tracing::info!(
            backend = self.inner.api.name(),
            model = %request.model,
            history = request.messages.len(),
            ?kind,
            "requesting response"
        );

        let result = tokio::select! {
            biased;
            () = token.cancelled() => Err(ChatError::cancelled()),
            result = self.inner.api.send(&request) => result,
        };

        if token.is_cancelled() {
            return ResponseOutcome::Stopped { id };
        }

        match result {
            Ok(text) => self.reveal(id, &text, &token).await,
            Err(error) => self.fail(kind, id, error, &token),
        }
    }

    async fn reveal(&self, id: MessageId, text: &str, token: &CancellationToken) -> ResponseOutcome {
        {
            let mut state = self.state();
            if token.is_cancelled() {
                return ResponseOutcome::Stopped { id };
            }
            state.phase = Phase::Revealing;
            if let Some(message) = state.get_mut(id) {
                message.set_typing(true);
            }
            self.emit_phase(Phase::Revealing);
        }

        let outcome = self
            .inner
            .animator
            .animate(text, token, |revealed| {
                let mut state = self.state();
                if let Some(message) = state.get_mut(id) {
                    message.set_content(revealed);
                }
                self.emit(ConversationEvent::ContentRevealed {
                    id,
                    content: revealed.to_string(),
                });
                self.emit(ConversationEvent::ScrollToBottom);
            })
            .await;

        if outcome == AnimationOutcome::Cancelled {
            return ResponseOutcome::Stopped { id };
        }

        {
            let mut state = self.state();
            if token.is_cancelled() {
                return ResponseOutcome::Stopped { id };
            }
            if let Some(message) = state.get_mut(id) {
                message.set_content(text);
            }
            state.end_cycle(Phase::Idle);
            self.disarm_cancel();
            self.emit(ConversationEvent::ResponseCompleted { id });
            self.emit_phase(Phase::Idle);
        }
        tracing::info!(%id, chars = text.chars().count(), "response completed");

        if self.inner.read_aloud.load(Ordering::SeqCst) {
            let spoken = prepare_for_speech(text);
            self.inner.speaker.speak(&spoken);
        }

        ResponseOutcome::Completed { id }
    }

    fn fail(
        &self,
        kind: CycleKind,
        id: MessageId,
        error: ChatError,
        token: &CancellationToken,
    ) -> ResponseOutcome {
        let mut state = self.state();
        if token.is_cancelled() {
            return ResponseOutcome::Stopped { id };
        }

        tracing::warn!(
            kind = %error.kind,
            details = error.details.as_deref().unwrap_or(""),
            "chat request failed: {error}"
        );

        if let Some(message) = state.get_mut(id) {
            match kind {
                CycleKind::Send => message.set_content(SEND_FAILED_MESSAGE),
                CycleKind::Regenerate => {
                    message.set_sender(Sender::Error);
                    message.set_content(format!("{REGENERATE_FAILED_PREFIX}: {error}"));
                }
            }
        }
        state.end_cycle(Phase::Error);
        self.disarm_cancel();

        if let Some(message) = state.get(id).cloned() {
            self.emit(ConversationEvent::MessageFailed { message });
        }
        self.emit_phase(Phase::Error);

        ResponseOutcome::Failed { id, error }
    }
}
