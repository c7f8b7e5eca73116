//! Zelf Conductor - Headless Streaming Session Engine
//!
//! This crate holds a multi-turn conversation with a Zelf agent backend and
//! exposes, in real time, the graph nodes and tools the agent runs while it
//! composes each answer. It is completely independent of any UI framework.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        UI Surface                            │
//! │   submit() / cancel()          observers + SessionUpdate     │
//! └───────────────┬──────────────────────────────▲───────────────┘
//!                 │                              │
//! ┌───────────────▼──────────────────────────────┴───────────────┐
//! │                        Conductor                             │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ FrameDecoder │──►│  AgentEvent  │──►│   SessionState   │  │
//! │  │   (bytes)    │   │   (parse)    │   │ trace + embeds   │  │
//! │  └──────▲───────┘   └──────────────┘   └──────────────────┘  │
//! │         │                                                    │
//! │  ┌──────┴───────────────────────┐                            │
//! │  │ AgentBackend (HTTP/scripted) │                            │
//! │  └──────────────────────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`markup`] lexer sits beside the engine: surfaces call
//! [`markup::lex`] on message content they display.
//!
//! # Quick Start
//!
//! ```ignore
//! use zelf_conductor::{Conductor, ConductorConfig, HttpBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), zelf_conductor::ConductorError> {
//!     let config = ConductorConfig::from_env();
//!     let backend = HttpBackend::new(&config)?;
//!     let conductor = Conductor::new(backend, config);
//!
//!     if let Some(turn) = conductor.submit("weather in NYC?", None) {
//!         turn.finished().await;
//!     }
//!     for message in conductor.messages() {
//!         println!("{:?}: {}", message.role, message.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Transport seam (HTTP and scripted backends)
//! - [`conductor`]: The session state machine
//! - [`config`]: Configuration from defaults, TOML and environment
//! - [`embeds`]: Media embeds and their collector
//! - [`error`]: Error types
//! - [`markup`]: Inline markup lexer
//! - [`messages`]: Conversation data, wire request and update notifications
//! - [`session`]: Observable session state and its transitions
//! - [`streaming`]: Frame decoder and event parser
//! - [`trace`]: Execution trace and its reconciler
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod conductor;
pub mod config;
pub mod embeds;
pub mod error;
pub mod markup;
pub mod messages;
pub mod session;
pub mod streaming;
pub mod trace;

// Re-exports for convenience
pub use backend::{AgentBackend, ChunkStream, HttpBackend, ScriptedBackend};
pub use conductor::{Conductor, TurnHandle};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConductorConfig, ConfigError,
};
pub use embeds::{Embed, EmbedCollector, SpotifyKind};
pub use error::ConductorError;
pub use markup::{lex, to_plain_text, Segment};
pub use messages::{
    ChatRequest, Location, Message, MessageId, MessageRole, SessionUpdate, TurnOutcome,
    WireMessage,
};
pub use session::{SessionSnapshot, SessionState, TurnId};
pub use streaming::{AgentEvent, Frame, FrameDecoder};
pub use trace::{TraceEntry, TraceId, TraceKind, TraceReconciler, TraceStatus};
