use crate::api::ApiClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::streaming::TurnPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    /// Set once at creation; in-place text replacement keeps it.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Assistant,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered conversation history. Append-only, except that the trailing
/// assistant message's text is replaced in place while its turn streams.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Full replace of the trailing assistant message's text; timestamp is
    /// untouched. Returns false when the transcript does not end in an
    /// assistant message.
    pub(super) fn replace_trailing_assistant_text(&mut self, text: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.sender == Sender::Assistant => {
                last.text = text.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Assembler-to-caller signals, one variant per observable effect.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptUpdate {
    /// A message entered the transcript (user on submit, assistant on the
    /// first answer frame of a turn).
    Append(Message),
    /// The trailing assistant message's text was replaced.
    Replace(String),
    /// Progress side channel; carries no transcript change.
    Status(String),
    /// The backend closed the turn, with its thread id when it sent one.
    Complete(Option<String>),
}

/// Owns the transcript and the per-turn reduction state. Turn driving lives
/// in `core.rs`, frame reduction in `streaming.rs`.
pub struct TranscriptManager {
    pub(super) client: Arc<ApiClient>,
    pub(super) transcript: Transcript,
    pub(super) phase: TurnPhase,
    pub(super) thread_id: Option<String>,
}

impl TranscriptManager {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client: Arc::new(client),
            transcript: Transcript::default(),
            phase: TurnPhase::Idle,
            thread_id: None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Thread id reported by the most recent `complete` frame, kept only for
    /// correlation across turns.
    pub fn last_thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Start-over: drops the transcript and any open turn state.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.phase = TurnPhase::Idle;
        self.thread_id = None;
    }

    /// Caller policy after a failed turn: append a user-visible assistant
    /// message. The reduction itself never synthesizes transcript text.
    pub fn append_fallback_assistant(
        &mut self,
        text: &str,
        update_tx: Option<&mpsc::UnboundedSender<TranscriptUpdate>>,
    ) {
        let message = Message::assistant(text);
        self.transcript.push(message.clone());
        super::streaming::emit_update(update_tx, TranscriptUpdate::Append(message));
    }
}
