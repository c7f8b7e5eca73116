//! Streaming Protocol
//!
//! Decoding of the agent's response stream, leaf-first:
//!
//! ```text
//!  bytes (any chunking) ──► FrameDecoder ──► Frame ──► AgentEvent::parse ──► AgentEvent
//! ```
//!
//! Neither stage ever fails the stream: an unterminated tail is discarded at
//! end of stream and a malformed payload is skipped. Only transport errors
//! reach the session.

pub mod event;
pub mod frame;

pub use event::AgentEvent;
pub use frame::{Frame, FrameDecoder};
