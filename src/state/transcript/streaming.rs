use super::state::{Message, TranscriptManager, TranscriptUpdate};
use crate::types::StreamFrame;
use tokio::sync::mpsc;

/// Per-turn reduction state. `AwaitingFirstAnswer` means the user message is
/// in but no assistant message is open yet; `Streaming` means the trailing
/// assistant message is subject to in-place replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingFirstAnswer,
    Streaming,
    Closed,
}

/// What one reduced frame means for the turn driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum FrameOutcome {
    Continue,
    Completed(Option<String>),
    Failed(String),
}

impl TranscriptManager {
    /// Open a new user turn: append the user message synchronously and reset
    /// the open-assistant-message state.
    pub fn begin_turn(
        &mut self,
        query: &str,
        update_tx: Option<&mpsc::UnboundedSender<TranscriptUpdate>>,
    ) {
        let message = Message::user(query);
        self.transcript.push(message.clone());
        emit_update(update_tx, TranscriptUpdate::Append(message));
        self.phase = TurnPhase::AwaitingFirstAnswer;
    }

    /// Reduce one decoded frame into transcript state.
    ///
    /// A closed turn tolerates trailing frames: whatever still arrives after
    /// `complete`, an `error`, or stream end is dropped without effect.
    pub(super) fn apply_frame(
        &mut self,
        frame: StreamFrame,
        update_tx: Option<&mpsc::UnboundedSender<TranscriptUpdate>>,
    ) -> FrameOutcome {
        if matches!(self.phase, TurnPhase::Idle | TurnPhase::Closed) {
            return FrameOutcome::Continue;
        }

        match frame {
            StreamFrame::Status { message } => {
                emit_update(update_tx, TranscriptUpdate::Status(message));
                FrameOutcome::Continue
            }
            StreamFrame::Answer { content } => {
                if self.phase == TurnPhase::Streaming
                    && self.transcript.replace_trailing_assistant_text(&content)
                {
                    emit_update(update_tx, TranscriptUpdate::Replace(content));
                } else {
                    let message = Message::assistant(content);
                    self.transcript.push(message.clone());
                    emit_update(update_tx, TranscriptUpdate::Append(message));
                    self.phase = TurnPhase::Streaming;
                }
                FrameOutcome::Continue
            }
            StreamFrame::Complete { thread_id } => {
                if thread_id.is_some() {
                    self.thread_id = thread_id.clone();
                }
                self.phase = TurnPhase::Closed;
                emit_update(update_tx, TranscriptUpdate::Complete(thread_id.clone()));
                FrameOutcome::Completed(thread_id)
            }
            StreamFrame::Error { message } => {
                self.phase = TurnPhase::Closed;
                FrameOutcome::Failed(message)
            }
            StreamFrame::Unknown => FrameOutcome::Continue,
        }
    }

    /// Transport closed (naturally or by cancellation). Missing `complete`
    /// is not an error; the turn just ends where the last reduced `answer`
    /// left it.
    pub fn finish_turn(&mut self) {
        self.phase = TurnPhase::Closed;
    }
}

pub(super) fn emit_update(
    update_tx: Option<&mpsc::UnboundedSender<TranscriptUpdate>>,
    update: TranscriptUpdate,
) {
    if let Some(tx) = update_tx {
        let _ = tx.send(update);
    }
}
