use crate::api::client::{ByteStream, MockStreamProducer};
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// Test double for the streaming endpoint: each configured response is a
/// list of raw byte chunks handed to the parser exactly as written, so tests
/// control chunk boundaries down to the byte.
#[derive(Clone)]
pub struct MockChatBackend {
    responses: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockChatBackend {
    pub fn new(responses: Vec<Vec<String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }

    /// One response whose chunks are complete `data:` lines.
    pub fn single_turn(lines: &[&str]) -> Self {
        Self::new(vec![lines
            .iter()
            .map(|line| format!("{line}\n"))
            .collect()])
    }
}

impl MockStreamProducer for MockChatBackend {
    fn create_mock_stream(&self, _query: &str) -> Result<ByteStream> {
        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(anyhow::anyhow!(
                "MockChatBackend: no more responses configured"
            ));
        }
        let chunks = responses_guard.remove(0);

        let byte_chunks: Vec<Result<Bytes>> =
            chunks.into_iter().map(|s| Ok(Bytes::from(s))).collect();
        Ok(Box::pin(stream::iter(byte_chunks)))
    }
}

/// A transport that fails mid-stream after the given chunks.
pub struct FailingChatBackend {
    prefix_chunks: Vec<String>,
    error_message: String,
}

impl FailingChatBackend {
    pub fn new(prefix_chunks: Vec<String>, error_message: &str) -> Self {
        Self {
            prefix_chunks,
            error_message: error_message.to_string(),
        }
    }
}

impl MockStreamProducer for FailingChatBackend {
    fn create_mock_stream(&self, _query: &str) -> Result<ByteStream> {
        let mut items: Vec<Result<Bytes>> = self
            .prefix_chunks
            .iter()
            .map(|s| Ok(Bytes::from(s.clone())))
            .collect();
        items.push(Err(anyhow::anyhow!("{}", self.error_message)));
        Ok(Box::pin(stream::iter(items)))
    }
}
