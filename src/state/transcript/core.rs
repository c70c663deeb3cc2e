use super::state::{TranscriptManager, TranscriptUpdate};
use super::streaming::FrameOutcome;
use crate::api::stream::StreamParser;
use anyhow::{anyhow, Result};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

impl TranscriptManager {
    /// Run one full turn: append the user message, open the streamed POST,
    /// feed chunks through the parser, and reduce every frame.
    ///
    /// Returns the thread id from the turn's `complete` frame when one
    /// arrived. A transport failure or a backend `error` frame surfaces as a
    /// single `Err`; appending a user-visible fallback message is the
    /// caller's decision. Cancelling the token abandons the read loop and
    /// leaves the transcript at the last reduced `answer`.
    pub async fn send_message(
        &mut self,
        query: String,
        thread_id: String,
        cancel: CancellationToken,
        update_tx: Option<&mpsc::UnboundedSender<TranscriptUpdate>>,
    ) -> Result<Option<String>> {
        self.begin_turn(&query, update_tx);

        let mut stream = match self.client.create_chat_stream(&query, &thread_id).await {
            Ok(stream) => stream,
            Err(error) => {
                self.finish_turn();
                return Err(error);
            }
        };

        let mut parser = StreamParser::new();
        let mut completed_thread_id: Option<String> = None;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                chunk = stream.next() => chunk,
            };

            let chunk = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(error)) => {
                    self.finish_turn();
                    return Err(error);
                }
                None => break,
            };

            for frame in parser.feed(&chunk) {
                match self.apply_frame(frame, update_tx) {
                    FrameOutcome::Continue => {}
                    FrameOutcome::Completed(thread_id) => {
                        completed_thread_id = thread_id.or(completed_thread_id);
                    }
                    FrameOutcome::Failed(message) => {
                        // The turn is already closed; drain nothing further.
                        return Err(anyhow!(message));
                    }
                }
            }
        }

        self.finish_turn();
        Ok(completed_thread_id)
    }
}
