//! Agent Backend Integration
//!
//! This module provides abstracted access to the agent backend through a
//! common trait interface. The Conductor only sees a stream of raw chunks;
//! framing and event parsing happen above this layer.
//!
//! # Available Backends
//!
//! - **Http**: The Zelf agent server (`POST /chat/stream`)
//! - **Scripted**: Replays a recorded SSE transcript (tests, offline demos)
//!
//! # Usage
//!
//! ```ignore
//! use zelf_conductor::backend::{AgentBackend, HttpBackend};
//!
//! let backend = HttpBackend::new(&ConductorConfig::from_env())?;
//! let chunks = backend.open_stream(&request).await?;
//! ```

mod http;
mod scripted;
mod traits;

pub use http::HttpBackend;
pub use scripted::ScriptedBackend;
pub use traits::{AgentBackend, ChunkStream};
