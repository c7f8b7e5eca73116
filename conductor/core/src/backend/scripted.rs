//! Scripted Backend
//!
//! Replays a fixed SSE transcript instead of calling a server. The transcript
//! is cut into fixed-size chunks so callers can exercise chunk boundaries
//! (including splits inside a multi-byte character).

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{AgentBackend, ChunkStream};
use crate::error::ConductorError;
use crate::messages::ChatRequest;
use crate::streaming::{frame, AgentEvent};

/// Backend that replays a recorded transcript on every turn
#[derive(Debug)]
pub struct ScriptedBackend {
    transcript: Vec<u8>,
    chunk_size: usize,
    /// Status and body to fail with instead of streaming
    failure: Option<(u16, String)>,
    opened: AtomicUsize,
    last_request: Mutex<Option<ChatRequest>>,
}

impl ScriptedBackend {
    /// Replay raw transcript bytes
    pub fn new(transcript: impl Into<Vec<u8>>) -> Self {
        Self {
            transcript: transcript.into(),
            chunk_size: usize::MAX,
            failure: None,
            opened: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Replay a sequence of events, one frame each
    #[must_use]
    pub fn from_events(events: &[AgentEvent]) -> Self {
        let transcript: String = events
            .iter()
            .filter_map(|event| serde_json::to_string(event).ok())
            .map(|json| frame::encode(&json))
            .collect();
        Self::new(transcript)
    }

    /// Fail every turn with this HTTP status
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        let mut backend = Self::new(Vec::new());
        backend.failure = Some((status, body.into()));
        backend
    }

    /// Deliver the transcript in chunks of `size` bytes
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// How many streams have been opened
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// The most recent request body
    #[must_use]
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request.lock().clone()
    }
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn health_check(&self) -> bool {
        self.failure.is_none()
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ChunkStream, ConductorError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());

        if let Some((status, body)) = &self.failure {
            return Err(ConductorError::Status {
                status: *status,
                body: body.clone(),
            });
        }

        let chunks: Vec<Result<Vec<u8>, ConductorError>> = self
            .transcript
            .chunks(self.chunk_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    use crate::streaming::FrameDecoder;

    fn request() -> ChatRequest {
        ChatRequest {
            messages: Vec::new(),
            location: None,
        }
    }

    #[tokio::test]
    async fn test_replays_in_chunks() {
        let backend = ScriptedBackend::from_events(&[
            AgentEvent::Token {
                content: "Hi".to_string(),
            },
            AgentEvent::Done,
        ])
        .with_chunk_size(3);

        let chunks: Vec<Vec<u8>> = backend
            .open_stream(&request())
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;
        assert!(chunks.iter().all(|c| c.len() <= 3));

        let frames = FrameDecoder::decode_all(&chunks.concat());
        let events: Vec<_> = frames
            .iter()
            .filter_map(|f| AgentEvent::parse(&f.payload))
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], AgentEvent::Done);
        assert_eq!(backend.open_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let backend = ScriptedBackend::failing(503, "overloaded");
        assert!(!backend.health_check().await);
        let result = backend.open_stream(&request()).await;
        assert!(matches!(
            result,
            Err(ConductorError::Status { status: 503, .. })
        ));
        assert!(backend.last_request().is_some());
    }
}
