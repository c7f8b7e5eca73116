//! Agent Backend Traits
//!
//! Trait definitions for agent backends. This abstraction lets the Conductor
//! run against the real HTTP server, a recorded transcript, or a test double
//! without changing core logic.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ConductorError;
use crate::messages::ChatRequest;

/// Raw response body, chunked however the transport delivers it
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ConductorError>> + Send>>;

/// Agent backend trait
///
/// Implement this trait to add support for a different transport.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Get the backend name (e.g., "Http")
    fn name(&self) -> &str;

    /// Check if the backend is healthy and reachable
    async fn health_check(&self) -> bool;

    /// Send one turn and get the streaming response body
    ///
    /// Errors here (connection refused, non-200 status) are terminal for the
    /// turn. Errors yielded later by the stream are too.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ChunkStream, ConductorError>;
}
